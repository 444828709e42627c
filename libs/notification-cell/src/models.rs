use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::clock::hh_mm;
use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Confirmation,
    Reminder,
    Cancellation,
    Reschedule,
    DisputeResolved,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::Confirmation => "confirmation",
            NotificationEvent::Reminder => "reminder",
            NotificationEvent::Cancellation => "cancellation",
            NotificationEvent::Reschedule => "reschedule",
            NotificationEvent::DisputeResolved => "dispute_resolved",
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tally of one fan-out. Individual send failures land in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationReport {
    pub emails_sent: u32,
    pub sms_sent: u32,
    pub errors: Vec<String>,
}

impl NotificationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// The appointment fields templates need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentBrief {
    pub id: Uuid,
    pub client_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    pub total_cost: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub client_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationContext {
    pub appointment: AppointmentBrief,
    pub client: Contact,
    pub specialist: Contact,
}

impl NotificationContext {
    /// Client phone on file, else the number captured at booking.
    pub fn sms_recipient(&self) -> Option<&str> {
        self.client
            .phone
            .as_deref()
            .or(self.appointment.client_phone.as_deref())
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// Body of a direct notification request from another service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendNotificationRequest {
    pub appointment_id: Option<Uuid>,
    pub notification_type: Option<NotificationEvent>,
    pub custom_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderRunReport {
    pub date: NaiveDate,
    pub appointments_found: usize,
    pub appointments_processed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} rejected message ({status}): {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Missing client or specialist information")]
    MissingContacts,
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::AppointmentNotFound => AppError::NotFound(err.to_string()),
            NotificationError::MissingContacts => AppError::Precondition(err.to_string()),
            NotificationError::Transport(_) => AppError::upstream(err.to_string(), true),
            NotificationError::Provider { status, .. } => AppError::upstream(err.to_string(), status >= 500),
        }
    }
}
