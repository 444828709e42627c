use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

// ==============================================================================
// DISPUTES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisputeStatus {
    Open,
    Resolved,
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisputeStatus::Open => write!(f, "open"),
            DisputeStatus::Resolved => write!(f, "resolved"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dispute {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub raised_by: Uuid,
    pub reason: String,
    pub status: DisputeStatus,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub resolved_by: Option<Uuid>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDispute {
    pub appointment_id: Uuid,
    pub raised_by: Uuid,
    pub reason: String,
    pub status: DisputeStatus,
}

/// Fields written when an admin closes a dispute.
#[derive(Debug, Clone, Serialize)]
pub struct DisputeResolution {
    pub resolution_notes: String,
    pub resolved_by: Uuid,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeScope {
    All,
    RaisedBy(Uuid),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDisputeRequest {
    pub appointment_id: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveDisputeRequest {
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisputeCreated {
    pub dispute_id: Uuid,
    pub status: DisputeStatus,
}

// ==============================================================================
// REVIEWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub appointment_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: i64,
    pub comment: Option<String>,
}

/// Whose reviews to list: one specialist's, or those a client wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewScope {
    Specialist(Uuid),
    Client(Uuid),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReviewRequest {
    pub appointment_id: Option<Uuid>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewQuery {
    pub specialist_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewCreated {
    pub review_id: Uuid,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DisputeError {
    #[error("Missing required fields: {0}")]
    MissingFields(&'static str),

    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,

    #[error("Dispute not found")]
    NotFound,

    #[error("Only the client or specialist can raise a dispute for this appointment")]
    NotAParticipant,

    #[error("Only the client can review this appointment")]
    NotTheClient,

    #[error("Can only raise disputes for confirmed or completed appointments (appointment is {0})")]
    NotDisputable(AppointmentStatus),

    #[error("Can only review completed appointments (appointment is {0})")]
    NotReviewable(AppointmentStatus),

    #[error("You already have an open dispute for this appointment")]
    DuplicateOpenDispute,

    #[error("Dispute is already resolved")]
    AlreadyResolved,

    #[error("Review already exists for this appointment")]
    DuplicateReview,
}

impl From<DisputeError> for AppError {
    fn from(err: DisputeError) -> Self {
        match err {
            DisputeError::MissingFields(_) | DisputeError::RatingOutOfRange => AppError::Input(err.to_string()),
            DisputeError::NotFound => AppError::NotFound(err.to_string()),
            DisputeError::NotAParticipant | DisputeError::NotTheClient => AppError::Permission(err.to_string()),
            DisputeError::NotDisputable(_)
            | DisputeError::NotReviewable(_)
            | DisputeError::DuplicateOpenDispute
            | DisputeError::AlreadyResolved
            | DisputeError::DuplicateReview => AppError::Precondition(err.to_string()),
        }
    }
}
