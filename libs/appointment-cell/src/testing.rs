//! In-memory stores and a scripted gateway for booking tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, AppointmentScope, CheckoutRequest, CheckoutSession, GatewayEvent,
    NewAppointment, NewPayment, Payment, PaymentStatus,
};
use crate::services::gateway::{parse_event, signature_header, verify_signature};
use crate::services::{AppointmentStore, PaymentGateway, PaymentStore};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    rows: Mutex<HashMap<Uuid, Appointment>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl InMemoryAppointmentStore {
    pub fn seed(
        &self,
        client_id: Uuid,
        specialist_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        status: AppointmentStatus,
    ) -> Appointment {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            client_id,
            specialist_id,
            date,
            start_time: start,
            end_time: end,
            status,
            total_cost: 0.0,
            description: "Seeded".to_string(),
            client_phone: None,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        guard(&self.rows).insert(appointment.id, appointment.clone());
        appointment
    }

    pub fn get(&self, appointment_id: Uuid) -> Option<Appointment> {
        guard(&self.rows).get(&appointment_id).cloned()
    }

    pub fn all(&self) -> Vec<Appointment> {
        guard(&self.rows).values().cloned().collect()
    }

    pub fn deleted(&self) -> Vec<Uuid> {
        guard(&self.deleted).clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppError> {
        Ok(self.get(appointment_id))
    }

    async fn list_appointments(&self, scope: AppointmentScope) -> Result<Vec<Appointment>, AppError> {
        let mut rows: Vec<Appointment> = guard(&self.rows)
            .values()
            .filter(|a| match scope {
                AppointmentScope::Client(id) => a.client_id == id,
                AppointmentScope::Specialist(id) => a.specialist_id == id,
                AppointmentScope::All => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.date, b.start_time).cmp(&(a.date, a.start_time)));
        Ok(rows)
    }

    async fn list_blocking(&self, specialist_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, AppError> {
        Ok(guard(&self.rows)
            .values()
            .filter(|a| a.specialist_id == specialist_id && a.date == date && a.status.blocks_schedule())
            .cloned()
            .collect())
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, AppError> {
        let stored = Appointment {
            id: Uuid::new_v4(),
            client_id: appointment.client_id,
            specialist_id: appointment.specialist_id,
            date: appointment.date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            status: appointment.status,
            total_cost: appointment.total_cost,
            description: appointment.description,
            client_phone: appointment.client_phone,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        guard(&self.rows).insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppError> {
        guard(&self.rows).remove(&appointment_id);
        guard(&self.deleted).push(appointment_id);
        Ok(())
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppError> {
        let mut rows = guard(&self.rows);
        let row = rows.get_mut(&appointment_id).ok_or(AppointmentError::NotFound)?;
        row.status = status;
        row.updated_at = Some(Utc::now());
        Ok(row.clone())
    }

    async fn update_schedule(
        &self,
        appointment_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Appointment, AppError> {
        let mut rows = guard(&self.rows);
        let row = rows.get_mut(&appointment_id).ok_or(AppointmentError::NotFound)?;
        row.date = date;
        row.start_time = start_time;
        row.end_time = end_time;
        row.updated_at = Some(Utc::now());
        Ok(row.clone())
    }
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

/// Payment rows; `fail_inserts()` makes every insert fail like a store outage.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    rows: Mutex<HashMap<Uuid, Payment>>,
    fail_inserts: AtomicBool,
    mark_paid_calls: Mutex<u32>,
}

impl InMemoryPaymentStore {
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn seed(&self, appointment_id: Uuid, amount: f64, status: PaymentStatus) -> Payment {
        let payment = Payment {
            id: Uuid::new_v4(),
            appointment_id,
            amount,
            status,
            method: Some("stripe".to_string()),
            gateway_reference: None,
        };
        guard(&self.rows).insert(payment.id, payment.clone());
        payment
    }

    pub fn get(&self, payment_id: Uuid) -> Option<Payment> {
        guard(&self.rows).get(&payment_id).cloned()
    }

    pub fn all(&self) -> Vec<Payment> {
        guard(&self.rows).values().cloned().collect()
    }

    pub fn mark_paid_calls(&self) -> u32 {
        *guard(&self.mark_paid_calls)
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        Ok(self.get(payment_id))
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, AppError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::upstream("payments table unavailable", true));
        }
        let stored = Payment {
            id: Uuid::new_v4(),
            appointment_id: payment.appointment_id,
            amount: payment.amount,
            status: payment.status,
            method: Some(payment.method),
            gateway_reference: None,
        };
        guard(&self.rows).insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn attach_session(&self, payment_id: Uuid, session_id: &str) -> Result<(), AppError> {
        let mut rows = guard(&self.rows);
        let row = rows.get_mut(&payment_id).ok_or(AppointmentError::PaymentNotFound)?;
        row.gateway_reference = Some(session_id.to_string());
        Ok(())
    }

    async fn mark_paid(&self, payment_id: Uuid, transaction_reference: &str) -> Result<Payment, AppError> {
        *guard(&self.mark_paid_calls) += 1;
        let mut rows = guard(&self.rows);
        let row = rows.get_mut(&payment_id).ok_or(AppointmentError::PaymentNotFound)?;
        row.status = PaymentStatus::Paid;
        row.gateway_reference = Some(transaction_reference.to_string());
        Ok(row.clone())
    }

    async fn reset_pending(&self, payment_id: Uuid) -> Result<(), AppError> {
        let mut rows = guard(&self.rows);
        let row = rows.get_mut(&payment_id).ok_or(AppointmentError::PaymentNotFound)?;
        row.status = PaymentStatus::Pending;
        Ok(())
    }
}

// ==============================================================================
// GATEWAY
// ==============================================================================

pub const FAKE_WEBHOOK_SECRET: &str = "whsec_fake_gateway";
const FAKE_TOLERANCE_SECS: i64 = 300;

/// Records checkout requests and verifies webhooks with `FAKE_WEBHOOK_SECRET`.
#[derive(Default)]
pub struct FakeGateway {
    checkouts: Mutex<Vec<CheckoutRequest>>,
    unavailable: AtomicBool,
}

impl FakeGateway {
    pub fn unavailable() -> Self {
        let gateway = Self::default();
        gateway.unavailable.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        guard(&self.checkouts).clone()
    }

    /// A currently valid signature header for `payload`.
    pub fn sign(payload: &[u8]) -> String {
        signature_header(payload, FAKE_WEBHOOK_SECRET, Utc::now().timestamp()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::upstream("Payment gateway unreachable", true));
        }
        guard(&self.checkouts).push(request.clone());
        let id = format!("cs_test_{}", request.appointment_id.simple());
        Ok(CheckoutSession {
            url: format!("https://checkout.example.com/pay/{}", id),
            id,
        })
    }

    fn construct_event(&self, payload: &[u8], signature_header: &str) -> Result<GatewayEvent, AppError> {
        verify_signature(
            payload,
            signature_header,
            FAKE_WEBHOOK_SECRET,
            FAKE_TOLERANCE_SECS,
            Utc::now().timestamp(),
        )?;
        parse_event(payload)
    }
}
