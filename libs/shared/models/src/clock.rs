//! Time-of-day handling for schedule columns.
//!
//! The store returns `HH:MM:SS`, clients send `HH:MM`; both are accepted and
//! `HH:MM` is always written back. Request input goes through
//! [`parse_request_clock`] so nothing finer than a minute is ever priced or
//! checked.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serializer};

pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Like [`parse_clock`], but refuses a non-zero seconds part.
pub fn parse_request_clock(value: &str) -> Option<NaiveTime> {
    parse_clock(value).filter(|time| time.second() == 0 && time.nanosecond() == 0)
}

pub fn format_clock(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// `#[serde(with = "hh_mm")]` for `NaiveTime` fields.
pub mod hh_mm {
    use super::*;

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_clock(time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_clock(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {}", raw)))
    }
}
