use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::Role;
use shared_models::clock::hh_mm;
use shared_models::error::AppError;

/// Rate charged when a specialist has not set one.
pub const DEFAULT_HOURLY_RATE: f64 = 50.0;

// ==============================================================================
// DIRECTORY
// ==============================================================================

/// A marketplace account as stored in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl SpecialistProfile {
    pub fn effective_hourly_rate(&self) -> f64 {
        self.hourly_rate.unwrap_or(DEFAULT_HOURLY_RATE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactCard {
    pub name: String,
    pub email: String,
}

/// Verified specialist as shown to clients browsing the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistSummary {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub hourly_rate: f64,
    pub credentials: Option<String>,
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<AvailabilityWindow>,
}

#[derive(Debug, Deserialize)]
pub struct SpecialistListQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub verified: bool,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurring weekly window in which a specialist accepts bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub specialist_id: Uuid,
    pub day: DayOfWeek,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl AvailabilityWindow {
    /// True when `[start, end)` lies entirely inside the window.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start >= self.start_time && end <= self.end_time
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAvailabilityWindow {
    pub specialist_id: Uuid,
    pub day: DayOfWeek,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AvailabilityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<DayOfWeek>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_clock_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_clock_opt")]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

fn serialize_clock_opt<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match time {
        Some(time) => hh_mm::serialize(time, serializer),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day: Option<DayOfWeek>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub day: Option<DayOfWeek>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub specialist_id: Option<Uuid>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum SpecialistError {
    #[error("User data not found")]
    UserNotFound,

    #[error("Specialist profile not found")]
    ProfileNotFound,

    #[error("Availability not found")]
    AvailabilityNotFound,

    #[error("Missing required fields: {0}")]
    MissingFields(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Start time must be before end time")]
    InvertedWindow,

    #[error("You can only modify your own availability")]
    NotOwner,
}

impl From<SpecialistError> for AppError {
    fn from(err: SpecialistError) -> Self {
        match err {
            SpecialistError::UserNotFound
            | SpecialistError::ProfileNotFound
            | SpecialistError::AvailabilityNotFound => AppError::NotFound(err.to_string()),
            SpecialistError::MissingFields(_)
            | SpecialistError::InvalidTime(_)
            | SpecialistError::InvertedWindow => AppError::Input(err.to_string()),
            SpecialistError::NotOwner => AppError::Permission(err.to_string()),
        }
    }
}
