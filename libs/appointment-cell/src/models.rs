use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::AppointmentStatus;
use shared_models::clock::hh_mm;
use shared_models::error::AppError;
use specialist_cell::models::AvailabilityWindow;

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub total_cost: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub client_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub total_cost: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
}

/// Which appointments a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    Client(Uuid),
    Specialist(Uuid),
    All,
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub amount: f64,
    pub status: PaymentStatus,
    #[serde(default)]
    pub method: Option<String>,
    /// Checkout session id until paid, then the processor's transaction id.
    #[serde(default, rename = "stripe_payment_intent_id")]
    pub gateway_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    pub appointment_id: Uuid,
    pub amount: f64,
    pub status: PaymentStatus,
    pub method: String,
}

// ==============================================================================
// REQUESTS AND RESPONSES
// ==============================================================================

/// Booking input. Every field is optional on the wire so that a missing one
/// is reported as an input error naming it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookAppointmentRequest {
    pub specialist_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub client_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingResponse {
    pub appointment_id: Uuid,
    pub payment_id: Uuid,
    pub session_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub duration_hours: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    #[serde(with = "hh_mm")]
    pub start: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end: NaiveTime,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotListing {
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub duration_hours: u32,
    pub window: AvailabilityWindow,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdateResponse {
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RescheduleRequest {
    pub new_date: Option<NaiveDate>,
    pub new_start_time: Option<String>,
    pub new_end_time: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ==============================================================================
// GATEWAY
// ==============================================================================

/// Everything the gateway needs to open a hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub appointment_id: Uuid,
    pub payment_id: Uuid,
    pub client_id: Uuid,
    pub specialist_id: Uuid,
    pub customer_email: String,
    pub specialist_name: String,
    pub description: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Ids the booking attached to the checkout session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckoutMetadata {
    pub appointment_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub specialist_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEventKind {
    CheckoutCompleted,
    CheckoutExpired,
    Other(String),
}

impl GatewayEventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => GatewayEventKind::CheckoutCompleted,
            "checkout.session.expired" => GatewayEventKind::CheckoutExpired,
            other => GatewayEventKind::Other(other.to_string()),
        }
    }
}

/// A verified webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub id: String,
    pub kind: GatewayEventKind,
    pub session_id: String,
    pub payment_intent: Option<String>,
    pub metadata: CheckoutMetadata,
}

impl GatewayEvent {
    /// Transaction reference persisted on a paid payment.
    pub fn transaction_reference(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.session_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Confirmed,
    AlreadyConfirmed,
    PaidForClosedAppointment,
    PaymentReleased,
    Ignored,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    #[error("Invalid time of day, expected HH:MM: {0}")]
    InvalidTime(String),

    #[error("Start time must be before end time")]
    InvertedTimes,

    #[error("Duration must be a whole number of hours, at least 1")]
    InvalidDuration,

    #[error("Appointment not found")]
    NotFound,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Specialist not found")]
    SpecialistNotFound,

    #[error("Specialist is not verified")]
    SpecialistNotVerified,

    #[error("Specialist not available on this day")]
    NotAvailableOnDay,

    #[error("Requested time slot is outside specialist availability")]
    OutsideAvailability,

    #[error("Time slot is already booked")]
    SlotAlreadyBooked,

    #[error("Appointment cannot be rescheduled while {0}")]
    NotReschedulable(AppointmentStatus),

    #[error("Missing required metadata")]
    MissingMetadata,

    #[error("Payment {0} does not belong to the appointment in the event metadata")]
    MetadataMismatch(Uuid),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Malformed webhook payload: {0}")]
    MalformedEvent(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::MissingFields(_)
            | AppointmentError::InvalidTime(_)
            | AppointmentError::InvertedTimes
            | AppointmentError::InvalidDuration
            | AppointmentError::OutsideAvailability
            | AppointmentError::MissingMetadata
            | AppointmentError::MetadataMismatch(_)
            | AppointmentError::MalformedEvent(_) => AppError::Input(err.to_string()),
            AppointmentError::NotFound
            | AppointmentError::PaymentNotFound
            | AppointmentError::SpecialistNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SpecialistNotVerified
            | AppointmentError::NotAvailableOnDay
            | AppointmentError::NotReschedulable(_) => AppError::Precondition(err.to_string()),
            AppointmentError::SlotAlreadyBooked => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidSignature(_) => AppError::Auth(err.to_string()),
        }
    }
}
