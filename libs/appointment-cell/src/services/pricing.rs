use chrono::NaiveTime;

/// Rate applied when a specialist has not set one.
pub use specialist_cell::models::DEFAULT_HOURLY_RATE;

/// Fractional hours between two times of the same day.
pub fn duration_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

/// Cost of `[start, end)` at `hourly_rate`. Not rounded.
pub fn total_cost(start: NaiveTime, end: NaiveTime, hourly_rate: f64) -> f64 {
    duration_hours(start, end) * hourly_rate
}
