use chrono::NaiveTime;
use uuid::Uuid;

use crate::models::Appointment;

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`.
///
/// Touching endpoints do not overlap. Both slot listing and booking
/// validation go through this predicate.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// Appointments holding time inside `[start, end)`.
///
/// Only pending and confirmed appointments block; `exclude` skips the row
/// being moved during a reschedule.
pub fn find_conflicts<'a>(
    start: NaiveTime,
    end: NaiveTime,
    existing: &'a [Appointment],
    exclude: Option<Uuid>,
) -> Vec<&'a Appointment> {
    existing
        .iter()
        .filter(|appointment| appointment.status.blocks_schedule())
        .filter(|appointment| Some(appointment.id) != exclude)
        .filter(|appointment| overlaps(start, end, appointment.start_time, appointment.end_time))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::appointment::AppointmentStatus;

    pub(crate) fn booked(start: u32, end: u32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            specialist_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            status,
            total_cost: 0.0,
            description: String::new(),
            client_phone: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn touching_endpoints_do_not_overlap() {
        assert!(!overlaps(at(9), at(10), at(10), at(11)));
        assert!(!overlaps(at(10), at(11), at(9), at(10)));
    }

    #[test]
    fn partial_and_nested_intervals_overlap() {
        assert!(overlaps(at(10), at(12), at(11), at(13)));
        assert!(overlaps(at(9), at(17), at(12), at(13)));
        assert!(overlaps(at(12), at(13), at(9), at(17)));
        assert!(overlaps(at(10), at(12), at(10), at(12)));
    }

    #[test]
    fn overlap_is_symmetric() {
        for a_start in 0..6 {
            for a_end in a_start + 1..7 {
                for b_start in 0..6 {
                    for b_end in b_start + 1..7 {
                        assert_eq!(
                            overlaps(a_start, a_end, b_start, b_end),
                            overlaps(b_start, b_end, a_start, a_end),
                        );
                        if a_end == b_start {
                            assert!(!overlaps(a_start, a_end, b_start, b_end));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn only_active_bookings_conflict() {
        let existing = vec![
            booked(10, 12, AppointmentStatus::Cancelled),
            booked(10, 12, AppointmentStatus::Completed),
        ];
        assert!(find_conflicts(at(10), at(12), &existing, None).is_empty());

        let existing = vec![booked(10, 12, AppointmentStatus::Pending)];
        assert_eq!(find_conflicts(at(11), at(13), &existing, None).len(), 1);
    }

    #[test]
    fn excluded_row_is_ignored() {
        let existing = vec![booked(10, 12, AppointmentStatus::Confirmed)];
        let own = existing[0].id;
        assert!(find_conflicts(at(11), at(13), &existing, Some(own)).is_empty());
    }
}
