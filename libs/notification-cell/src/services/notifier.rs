use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::audit::{AuditEntry, AuditLog, SupabaseAuditLog};
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{
    AppointmentBrief, Contact, NotificationContext, NotificationError, NotificationEvent,
    NotificationReport,
};
use crate::services::email::{EmailSender, SendGridClient};
use crate::services::sms::{SmsSender, TwilioClient};
use crate::services::templates;

/// Best-effort fan-out of one appointment event to both parties.
///
/// Individual send failures are reported in the returned tally. An `Err`
/// means the event could not be rendered at all (unknown appointment,
/// unreachable store); callers treat both outcomes as non-fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        appointment_id: Uuid,
        event: NotificationEvent,
        custom_message: Option<&str>,
    ) -> Result<NotificationReport, AppError>;
}

/// Appointment and contact lookups the notifier needs.
#[async_trait]
pub trait NotificationDirectory: Send + Sync {
    async fn load_context(&self, appointment_id: Uuid) -> Result<Option<NotificationContext>, AppError>;

    /// Ids of confirmed appointments dated `date`.
    async fn confirmed_appointments_on(&self, date: NaiveDate) -> Result<Vec<Uuid>, AppError>;
}

#[derive(Debug, Deserialize)]
struct ContactRow {
    id: Uuid,
    #[serde(flatten)]
    contact: Contact,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

pub struct SupabaseNotificationDirectory {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseNotificationDirectory {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl NotificationDirectory for SupabaseNotificationDirectory {
    async fn load_context(&self, appointment_id: Uuid) -> Result<Option<NotificationContext>, AppError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select=id,client_id,specialist_id,date,start_time,end_time,total_cost,description,client_phone",
            appointment_id
        );
        let Some(appointment) = self
            .supabase
            .fetch_optional::<AppointmentBrief>(&path, Some(&self.auth_token))
            .await?
        else {
            return Ok(None);
        };

        let path = format!(
            "/rest/v1/users?id=in.({},{})&select=id,name,email,phone",
            appointment.client_id, appointment.specialist_id
        );
        let rows: Vec<ContactRow> = self
            .supabase
            .request(Method::GET, &path, Some(&self.auth_token), None)
            .await?;
        let mut contacts: HashMap<Uuid, Contact> =
            rows.into_iter().map(|row| (row.id, row.contact)).collect();

        let client = contacts.remove(&appointment.client_id);
        let specialist = contacts.remove(&appointment.specialist_id);
        match (client, specialist) {
            (Some(client), Some(specialist)) => Ok(Some(NotificationContext {
                appointment,
                client,
                specialist,
            })),
            _ => Err(NotificationError::MissingContacts.into()),
        }
    }

    async fn confirmed_appointments_on(&self, date: NaiveDate) -> Result<Vec<Uuid>, AppError> {
        let path = format!(
            "/rest/v1/appointments?date=eq.{}&status=eq.confirmed&select=id",
            date
        );
        let rows: Vec<IdRow> = self
            .supabase
            .request(Method::GET, &path, Some(&self.auth_token), None)
            .await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

fn event_label(event: NotificationEvent) -> &'static str {
    match event {
        NotificationEvent::DisputeResolved => "dispute resolution",
        other => other.as_str(),
    }
}

pub struct NotificationService {
    directory: Arc<dyn NotificationDirectory>,
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    audit: Arc<dyn AuditLog>,
}

impl NotificationService {
    pub fn new(
        directory: Arc<dyn NotificationDirectory>,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            directory,
            email,
            sms,
            audit,
        }
    }

    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseNotificationDirectory::new(supabase.clone(), auth_token)),
            Arc::new(SendGridClient::new(config)),
            Arc::new(TwilioClient::new(config)),
            Arc::new(SupabaseAuditLog::new(supabase, auth_token)),
        )
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(
        &self,
        appointment_id: Uuid,
        event: NotificationEvent,
        custom_message: Option<&str>,
    ) -> Result<NotificationReport, AppError> {
        let ctx = self
            .directory
            .load_context(appointment_id)
            .await?
            .ok_or(NotificationError::AppointmentNotFound)?;

        let rendered = templates::render(event, &ctx, custom_message);
        let label = event_label(event);

        let sms_send = async {
            match &rendered.client_sms {
                Some(message) => Some(self.sms.send_sms(message).await),
                None => None,
            }
        };
        let (client_email, specialist_email, client_sms) = futures::join!(
            self.email.send_email(&rendered.client_email),
            self.email.send_email(&rendered.specialist_email),
            sms_send,
        );

        let mut report = NotificationReport::default();
        for (recipient, outcome) in [("client", client_email), ("specialist", specialist_email)] {
            match outcome {
                Ok(()) => report.emails_sent += 1,
                Err(e) => {
                    warn!("{} {} email for appointment {} failed: {}", recipient, label, appointment_id, e);
                    report.errors.push(format!("Failed to send {} {} email", recipient, label));
                }
            }
        }
        match client_sms {
            Some(Ok(())) => report.sms_sent += 1,
            Some(Err(e)) => {
                warn!("client {} SMS for appointment {} failed: {}", label, appointment_id, e);
                report.errors.push(format!("Failed to send client {} SMS", label));
            }
            None => debug!("No phone on file for appointment {}; SMS skipped", appointment_id),
        }

        info!(
            "Notification {} for appointment {}: {} emails, {} sms, {} errors",
            event,
            appointment_id,
            report.emails_sent,
            report.sms_sent,
            report.errors.len()
        );

        self.audit
            .record(AuditEntry::new(
                format!("notification_sent_{}", event),
                None,
                json!({
                    "appointment_id": appointment_id,
                    "results": report,
                }),
            ))
            .await;

        Ok(report)
    }
}
