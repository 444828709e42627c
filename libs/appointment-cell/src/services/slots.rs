use chrono::Duration;

use specialist_cell::models::AvailabilityWindow;

use crate::models::{Appointment, Slot};
use crate::services::conflict::overlaps;

/// Candidate slots of `duration_hours` inside `window`, one per hour.
///
/// Starts advance in one-hour steps regardless of the duration, so longer
/// slots overlap each other. A slot that would run past the window's end is
/// not emitted. A slot is unavailable when it overlaps a pending or confirmed
/// appointment in `existing`.
pub fn generate_slots(window: &AvailabilityWindow, duration_hours: u32, existing: &[Appointment]) -> Vec<Slot> {
    let mut slots = Vec::new();
    if duration_hours == 0 {
        return slots;
    }

    let length = Duration::hours(i64::from(duration_hours));
    let step = Duration::hours(1);
    let mut start = window.start_time;

    loop {
        let (end, wrapped) = start.overflowing_add_signed(length);
        if wrapped != 0 || end > window.end_time {
            break;
        }

        let available = !existing
            .iter()
            .filter(|appointment| appointment.status.blocks_schedule())
            .any(|appointment| overlaps(start, end, appointment.start_time, appointment.end_time));
        slots.push(Slot { start, end, available });

        let (next, wrapped) = start.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        start = next;
    }

    slots
}
