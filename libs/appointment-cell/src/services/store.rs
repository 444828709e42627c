use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, to_value, Value};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_models::appointment::AppointmentStatus;
use shared_models::clock::format_clock;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, AppointmentScope, NewAppointment, NewPayment, Payment, PaymentStatus,
};

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppError>;

    /// Newest date first.
    async fn list_appointments(&self, scope: AppointmentScope) -> Result<Vec<Appointment>, AppError>;

    /// Pending and confirmed appointments of one specialist on one date.
    async fn list_blocking(&self, specialist_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, AppError>;

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, AppError>;

    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppError>;

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppError>;

    async fn update_schedule(
        &self,
        appointment_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Appointment, AppError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError>;

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, AppError>;

    /// Records the checkout session a pending payment is waiting on.
    async fn attach_session(&self, payment_id: Uuid, session_id: &str) -> Result<(), AppError>;

    async fn mark_paid(&self, payment_id: Uuid, transaction_reference: &str) -> Result<Payment, AppError>;

    async fn reset_pending(&self, payment_id: Uuid) -> Result<(), AppError>;
}

fn encode(value: impl serde::Serialize) -> Result<Value, AppError> {
    to_value(value).map_err(|e| AppError::Internal(format!("Failed to encode row: {}", e)))
}

fn first<T>(rows: Vec<T>, missing: AppointmentError) -> Result<T, AppError> {
    rows.into_iter().next().ok_or_else(|| missing.into())
}

// ==============================================================================
// SUPABASE APPOINTMENTS
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(&self.auth_token)
    }

    async fn patch(&self, appointment_id: Uuid, body: Value) -> Result<Appointment, AppError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows = self
            .supabase
            .returning(Method::PATCH, &path, self.token(), body)
            .await?;
        first(rows, AppointmentError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        Ok(self.supabase.fetch_optional(&path, self.token()).await?)
    }

    async fn list_appointments(&self, scope: AppointmentScope) -> Result<Vec<Appointment>, AppError> {
        let filter = match scope {
            AppointmentScope::Client(id) => format!("client_id=eq.{}&", id),
            AppointmentScope::Specialist(id) => format!("specialist_id=eq.{}&", id),
            AppointmentScope::All => String::new(),
        };
        let path = format!("/rest/v1/appointments?{}order=date.desc,start_time.desc", filter);
        Ok(self.supabase.request(Method::GET, &path, self.token(), None).await?)
    }

    async fn list_blocking(&self, specialist_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, AppError> {
        let path = format!(
            "/rest/v1/appointments?specialist_id=eq.{}&date=eq.{}&status=in.(pending,confirmed)&order=start_time.asc",
            specialist_id, date
        );
        Ok(self.supabase.request(Method::GET, &path, self.token(), None).await?)
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, AppError> {
        let rows = self
            .supabase
            .returning(Method::POST, "/rest/v1/appointments", self.token(), encode(&appointment)?)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Appointment insert returned no row".to_string()))
    }

    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        Ok(self.supabase.execute(Method::DELETE, &path, self.token(), None).await?)
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppError> {
        self.patch(
            appointment_id,
            json!({ "status": status, "updated_at": Utc::now() }),
        )
        .await
    }

    async fn update_schedule(
        &self,
        appointment_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Appointment, AppError> {
        self.patch(
            appointment_id,
            json!({
                "date": date,
                "start_time": format_clock(&start_time),
                "end_time": format_clock(&end_time),
                "updated_at": Utc::now(),
            }),
        )
        .await
    }
}

// ==============================================================================
// SUPABASE PAYMENTS
// ==============================================================================

pub struct SupabasePaymentStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabasePaymentStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(&self.auth_token)
    }

    fn path(payment_id: Uuid) -> String {
        format!("/rest/v1/payments?id=eq.{}", payment_id)
    }
}

#[async_trait]
impl PaymentStore for SupabasePaymentStore {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        Ok(self.supabase.fetch_optional(&Self::path(payment_id), self.token()).await?)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, AppError> {
        let rows = self
            .supabase
            .returning(Method::POST, "/rest/v1/payments", self.token(), encode(&payment)?)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Payment insert returned no row".to_string()))
    }

    async fn attach_session(&self, payment_id: Uuid, session_id: &str) -> Result<(), AppError> {
        let body = json!({ "stripe_payment_intent_id": session_id });
        Ok(self
            .supabase
            .execute(Method::PATCH, &Self::path(payment_id), self.token(), Some(body))
            .await?)
    }

    async fn mark_paid(&self, payment_id: Uuid, transaction_reference: &str) -> Result<Payment, AppError> {
        let body = json!({
            "status": PaymentStatus::Paid,
            "stripe_payment_intent_id": transaction_reference,
            "updated_at": Utc::now(),
        });
        let rows = self
            .supabase
            .returning(Method::PATCH, &Self::path(payment_id), self.token(), body)
            .await?;
        first(rows, AppointmentError::PaymentNotFound)
    }

    async fn reset_pending(&self, payment_id: Uuid) -> Result<(), AppError> {
        let body = json!({ "status": PaymentStatus::Pending, "updated_at": Utc::now() });
        Ok(self
            .supabase
            .execute(Method::PATCH, &Self::path(payment_id), self.token(), Some(body))
            .await?)
    }
}
