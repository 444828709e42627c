mod common;

use assert_matches::assert_matches;
use chrono::Days;

use appointment_cell::models::{BookAppointmentRequest, PaymentStatus, RescheduleRequest, SlotQuery};
use appointment_cell::services::AppointmentStore;
use appointment_cell::testing::FakeGateway;
use notification_cell::models::NotificationEvent;
use notification_cell::testing::RecordingNotifier;
use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;
use specialist_cell::models::DayOfWeek;

use common::{at, monday, request, Harness};

#[tokio::test]
async fn monday_scenario_books_then_rejects_overlap() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(Some(50.0));
    let client = harness.directory.add_client();
    let service = harness.booking();

    let booking = service
        .book_appointment(client, request(specialist, monday(), "10:00", "12:00"))
        .await
        .unwrap();

    let appointment = harness.appointments.get(booking.appointment_id).unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.total_cost, 100.0);
    assert_eq!(appointment.start_time, at(10, 0));

    let payment = harness.payments.get(booking.payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 100.0);
    assert_eq!(payment.gateway_reference.as_deref(), Some(booking.session_id.as_str()));
    assert!(booking.checkout_url.starts_with("https://checkout.example.com/"));

    let second = service
        .book_appointment(client, request(specialist, monday(), "11:00", "13:00"))
        .await;
    assert_matches!(second, Err(AppError::Conflict(_)));
    assert_eq!(harness.appointments.all().len(), 1);
}

#[tokio::test]
async fn same_slot_twice_conflicts() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let service = harness.booking();

    let first = service
        .book_appointment(harness.directory.add_client(), request(specialist, monday(), "14:00", "15:00"))
        .await;
    assert!(first.is_ok());

    let second = service
        .book_appointment(harness.directory.add_client(), request(specialist, monday(), "14:00", "15:00"))
        .await;
    assert_matches!(second, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn adjacent_bookings_do_not_conflict() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let service = harness.booking();

    service
        .book_appointment(client, request(specialist, monday(), "09:00", "10:00"))
        .await
        .unwrap();
    service
        .book_appointment(client, request(specialist, monday(), "10:00", "11:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn fractional_hours_are_charged_exactly() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(Some(40.0));
    let client = harness.directory.add_client();

    let booking = harness
        .booking()
        .book_appointment(client, request(specialist, monday(), "09:00", "11:30"))
        .await
        .unwrap();

    assert_eq!(harness.appointments.get(booking.appointment_id).unwrap().total_cost, 100.0);
    assert_eq!(harness.gateway.checkouts()[0].amount, 100.0);
}

#[tokio::test]
async fn missing_rate_uses_default_and_zero_is_honoured() {
    let harness = Harness::new();
    let unset = harness.monday_specialist(None);
    let free = harness.monday_specialist(Some(0.0));
    let client = harness.directory.add_client();
    let service = harness.booking();

    let booking = service
        .book_appointment(client, request(unset, monday(), "09:00", "10:00"))
        .await
        .unwrap();
    assert_eq!(harness.appointments.get(booking.appointment_id).unwrap().total_cost, 50.0);

    let booking = service
        .book_appointment(client, request(free, monday(), "09:00", "10:00"))
        .await
        .unwrap();
    assert_eq!(harness.appointments.get(booking.appointment_id).unwrap().total_cost, 0.0);
}

#[tokio::test]
async fn missing_fields_are_input_errors() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let service = harness.booking();

    let mut blank = request(specialist, monday(), "10:00", "11:00");
    blank.description = Some("   ".to_string());
    assert_matches!(service.book_appointment(client, blank).await, Err(AppError::Input(_)));

    let empty = BookAppointmentRequest::default();
    assert_matches!(service.book_appointment(client, empty).await, Err(AppError::Input(_)));

    let garbled = request(specialist, monday(), "ten", "11:00");
    assert_matches!(service.book_appointment(client, garbled).await, Err(AppError::Input(_)));
    assert!(harness.appointments.all().is_empty());
}

#[tokio::test]
async fn times_are_whole_minutes() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(Some(60.0));
    let client = harness.directory.add_client();
    let service = harness.booking();

    for (start, end) in [("10:00:30", "12:00"), ("10:00", "11:59:59")] {
        let result = service.book_appointment(client, request(specialist, monday(), start, end)).await;
        assert_matches!(result, Err(AppError::Input(_)), "{}-{}", start, end);
    }
    assert!(harness.appointments.all().is_empty());
    assert!(harness.payments.all().is_empty());

    let booking = service
        .book_appointment(client, request(specialist, monday(), "10:00:00", "12:00"))
        .await
        .unwrap();
    let stored = harness.appointments.get(booking.appointment_id).unwrap();
    assert_eq!((stored.start_time, stored.end_time), (at(10, 0), at(12, 0)));
    assert_eq!(stored.total_cost, 120.0);

    let row = serde_json::to_value(&stored).unwrap();
    assert_eq!(row["start_time"], "10:00");
    assert_eq!(row["end_time"], "12:00");
}

#[tokio::test]
async fn only_clients_may_book() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let other_specialist = harness.monday_specialist(None);
    let admin = harness.directory.add_admin();
    let service = harness.booking();

    for caller in [other_specialist, admin] {
        let result = service
            .book_appointment(caller, request(specialist, monday(), "10:00", "11:00"))
            .await;
        assert_matches!(result, Err(AppError::Permission(_)));
    }
    assert!(harness.appointments.all().is_empty());
}

#[tokio::test]
async fn unverified_specialist_is_always_a_precondition_failure() {
    let harness = Harness::new();
    let specialist = harness.directory.add_specialist(false, Some(50.0));
    harness.availability.add_window(specialist, DayOfWeek::Monday, "09:00", "17:00");
    let client = harness.directory.add_client();
    let service = harness.booking();

    let cases = [
        (monday(), "10:00", "11:00"),
        (monday(), "18:00", "19:00"),
        (monday(), "12:00", "10:00"),
        (monday().checked_add_days(Days::new(1)).unwrap(), "10:00", "11:00"),
    ];
    for (date, start, end) in cases {
        let result = service.book_appointment(client, request(specialist, date, start, end)).await;
        assert_matches!(result, Err(AppError::Precondition(_)));
    }
}

#[tokio::test]
async fn unknown_specialist_is_not_found() {
    let harness = Harness::new();
    let client = harness.directory.add_client();
    let stranger = harness.directory.add_client();

    let result = harness
        .booking()
        .book_appointment(client, request(stranger, monday(), "10:00", "11:00"))
        .await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn day_without_window_is_a_precondition_failure() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let tuesday = monday().checked_add_days(Days::new(1)).unwrap();

    let result = harness
        .booking()
        .book_appointment(client, request(specialist, tuesday, "10:00", "11:00"))
        .await;
    assert_matches!(result, Err(AppError::Precondition(msg)) if msg.contains("not available"));
}

#[tokio::test]
async fn times_outside_or_inverted_are_input_errors() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let service = harness.booking();

    for (start, end) in [("08:00", "10:00"), ("16:00", "17:30"), ("12:00", "11:00"), ("12:00", "12:00")] {
        let result = service.book_appointment(client, request(specialist, monday(), start, end)).await;
        assert_matches!(result, Err(AppError::Input(_)), "{}-{}", start, end);
    }

    service
        .book_appointment(client, request(specialist, monday(), "09:00", "17:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_bookings_free_their_slot() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    harness.appointments.seed(
        client,
        specialist,
        monday(),
        at(10, 0),
        at(12, 0),
        AppointmentStatus::Cancelled,
    );

    harness
        .booking()
        .book_appointment(client, request(specialist, monday(), "10:00", "12:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_payment_record_removes_the_appointment() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    harness.payments.fail_inserts();

    let result = harness
        .booking()
        .book_appointment(client, request(specialist, monday(), "10:00", "11:00"))
        .await;

    assert_matches!(result, Err(AppError::Upstream { .. }));
    assert!(harness.appointments.all().is_empty());
    assert_eq!(harness.appointments.deleted().len(), 1);
    assert!(harness.gateway.checkouts().is_empty());
}

#[tokio::test]
async fn gateway_failure_leaves_pending_rows() {
    let harness = Harness::with(FakeGateway::unavailable(), RecordingNotifier::default());
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();

    let result = harness
        .booking()
        .book_appointment(client, request(specialist, monday(), "10:00", "11:00"))
        .await;

    assert_matches!(result, Err(AppError::Upstream { retryable: true, .. }));
    let appointments = harness.appointments.all();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Pending);
    assert_eq!(harness.payments.all()[0].status, PaymentStatus::Pending);
}

#[tokio::test]
async fn checkout_carries_booking_metadata() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();

    let booking = harness
        .booking()
        .book_appointment(client, request(specialist, monday(), "10:00", "11:00"))
        .await
        .unwrap();

    let checkout = &harness.gateway.checkouts()[0];
    assert_eq!(checkout.appointment_id, booking.appointment_id);
    assert_eq!(checkout.payment_id, booking.payment_id);
    assert_eq!(checkout.client_id, client);
    assert_eq!(checkout.specialist_id, specialist);
    assert_eq!(checkout.customer_email, harness.directory.account(client).unwrap().email);
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[tokio::test]
async fn slots_agree_with_booking_validation() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let service = harness.booking();

    service
        .book_appointment(client, request(specialist, monday(), "10:00", "12:00"))
        .await
        .unwrap();

    let listing = service
        .available_slots(SlotQuery {
            specialist_id: specialist,
            date: monday(),
            duration_hours: Some(2),
        })
        .await
        .unwrap();
    assert_eq!(listing.slots.len(), 7);

    for slot in &listing.slots {
        let attempt = service
            .book_appointment(
                harness.directory.add_client(),
                request(
                    specialist,
                    monday(),
                    &slot.start.format("%H:%M").to_string(),
                    &slot.end.format("%H:%M").to_string(),
                ),
            )
            .await;
        if slot.available {
            assert!(attempt.is_ok(), "slot {} should book", slot.start);
            harness
                .appointments
                .delete_appointment(attempt.unwrap().appointment_id)
                .await
                .unwrap();
        } else {
            assert_matches!(attempt, Err(AppError::Conflict(_)));
        }
    }
}

#[tokio::test]
async fn slot_listing_requires_a_window_and_a_positive_duration() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let service = harness.booking();

    let zero = service
        .available_slots(SlotQuery {
            specialist_id: specialist,
            date: monday(),
            duration_hours: Some(0),
        })
        .await;
    assert_matches!(zero, Err(AppError::Input(_)));

    let sunday = service
        .available_slots(SlotQuery {
            specialist_id: specialist,
            date: monday().checked_sub_days(Days::new(1)).unwrap(),
            duration_hours: None,
        })
        .await;
    assert_matches!(sunday, Err(AppError::Precondition(_)));

    let default = service
        .available_slots(SlotQuery {
            specialist_id: specialist,
            date: monday(),
            duration_hours: None,
        })
        .await
        .unwrap();
    assert_eq!(default.duration_hours, 1);
    assert_eq!(default.slots.len(), 8);
}

// ==============================================================================
// READS
// ==============================================================================

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let other_client = harness.directory.add_client();
    let admin = harness.directory.add_admin();
    harness.appointments.seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Pending);
    harness.appointments.seed(other_client, specialist, monday(), at(11, 0), at(12, 0), AppointmentStatus::Pending);
    let service = harness.booking();

    assert_eq!(service.list_appointments(client).await.unwrap().len(), 1);
    assert_eq!(service.list_appointments(specialist).await.unwrap().len(), 2);
    assert_eq!(service.list_appointments(admin).await.unwrap().len(), 2);

    let newest_first = service.list_appointments(admin).await.unwrap();
    assert_eq!(newest_first[0].start_time, at(11, 0));
}

#[tokio::test]
async fn outsiders_cannot_read_an_appointment() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let outsider = harness.directory.add_client();
    let admin = harness.directory.add_admin();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Pending);
    let service = harness.booking();

    assert!(service.get_appointment(client, appointment.id).await.is_ok());
    assert!(service.get_appointment(specialist, appointment.id).await.is_ok());
    assert!(service.get_appointment(admin, appointment.id).await.is_ok());
    assert_matches!(
        service.get_appointment(outsider, appointment.id).await,
        Err(AppError::Permission(_))
    );
    assert_matches!(
        service.get_appointment(client, uuid::Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    );
}

// ==============================================================================
// TRANSITIONS
// ==============================================================================

#[tokio::test]
async fn transition_table_is_enforced_for_every_combination() {
    use AppointmentStatus::*;

    let allowed = |who: &str, from: AppointmentStatus, to: AppointmentStatus| -> bool {
        matches!(
            (who, from, to),
            ("client", Pending | Confirmed, Cancelled)
                | ("specialist", Pending, Confirmed | Cancelled)
                | ("specialist", Confirmed, Completed | Cancelled)
                | ("admin", Pending | Confirmed, Confirmed | Cancelled | Completed)
        )
    };

    let statuses = [Pending, Confirmed, Cancelled, Completed];
    for who in ["client", "specialist", "admin", "outsider"] {
        for from in statuses {
            for to in statuses {
                let harness = Harness::new();
                let specialist = harness.monday_specialist(None);
                let client = harness.directory.add_client();
                let appointment = harness
                    .appointments
                    .seed(client, specialist, monday(), at(9, 0), at(10, 0), from);
                let caller = match who {
                    "client" => client,
                    "specialist" => specialist,
                    "admin" => harness.directory.add_admin(),
                    _ => harness.directory.add_client(),
                };

                let result = harness.booking().update_status(caller, appointment.id, to).await;
                if allowed(who, from, to) {
                    assert_eq!(result.unwrap().status, to, "{} {} -> {}", who, from, to);
                } else {
                    assert_matches!(result, Err(AppError::Permission(_)), "{} {} -> {}", who, from, to);
                    assert_eq!(harness.appointments.get(appointment.id).unwrap().status, from);
                }
                assert!(harness.notifier.calls().is_empty());
            }
        }
    }
}

#[tokio::test]
async fn cancellation_with_reason_notifies() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Confirmed);
    let service = harness.booking();

    let response = service
        .cancel_with_reason(client, appointment.id, Some("Travelling that week".to_string()))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(harness.appointments.get(appointment.id).unwrap().status, AppointmentStatus::Cancelled);
    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].event, NotificationEvent::Cancellation);
    assert_eq!(calls[0].custom_message.as_deref(), Some("Travelling that week"));

    assert_matches!(
        service.cancel_with_reason(client, appointment.id, None).await,
        Err(AppError::Permission(_))
    );
}

#[tokio::test]
async fn cancellation_survives_a_failing_notifier() {
    let harness = Harness::with(FakeGateway::default(), RecordingNotifier::failing());
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Pending);

    harness
        .booking()
        .cancel_with_reason(specialist, appointment.id, None)
        .await
        .unwrap();

    assert_eq!(harness.appointments.get(appointment.id).unwrap().status, AppointmentStatus::Cancelled);
    assert_eq!(
        harness.notifier.calls()[0].custom_message.as_deref(),
        Some("Cancelled by specialist")
    );
}

// ==============================================================================
// RESCHEDULE
// ==============================================================================

fn reschedule_to(start: &str, end: &str, reason: Option<&str>) -> RescheduleRequest {
    RescheduleRequest {
        new_date: Some(monday()),
        new_start_time: Some(start.to_string()),
        new_end_time: Some(end.to_string()),
        reason: reason.map(str::to_string),
    }
}

#[tokio::test]
async fn reschedule_moves_in_place_and_keeps_cost() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(Some(50.0));
    let client = harness.directory.add_client();
    let service = harness.booking();
    let booking = service
        .book_appointment(client, request(specialist, monday(), "10:00", "12:00"))
        .await
        .unwrap();

    let response = service
        .reschedule(client, booking.appointment_id, reschedule_to("11:00", "14:00", Some("Running late")))
        .await
        .unwrap();
    assert!(response.success);

    let moved = harness.appointments.get(booking.appointment_id).unwrap();
    assert_eq!((moved.start_time, moved.end_time), (at(11, 0), at(14, 0)));
    assert_eq!(moved.total_cost, 100.0);
    assert_eq!(harness.appointments.all().len(), 1);

    let calls = harness.notifier.calls();
    assert_eq!(calls[0].event, NotificationEvent::Reschedule);
    assert_eq!(calls[0].custom_message.as_deref(), Some("Running late"));
}

#[tokio::test]
async fn reschedule_checks_conflicts_and_window() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let mine = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Confirmed);
    harness
        .appointments
        .seed(client, specialist, monday(), at(13, 0), at(14, 0), AppointmentStatus::Pending);
    let service = harness.booking();

    assert_matches!(
        service.reschedule(client, mine.id, reschedule_to("13:30", "14:30", None)).await,
        Err(AppError::Conflict(_))
    );
    assert_matches!(
        service.reschedule(client, mine.id, reschedule_to("16:30", "17:30", None)).await,
        Err(AppError::Input(_))
    );
    assert_matches!(
        service.reschedule(client, mine.id, RescheduleRequest::default()).await,
        Err(AppError::Input(_))
    );
    assert_matches!(
        service.reschedule(client, mine.id, reschedule_to("11:00:15", "12:00", None)).await,
        Err(AppError::Input(_))
    );
    assert!(harness.notifier.calls().is_empty());

    service
        .reschedule(specialist, mine.id, reschedule_to("12:00", "13:00", None))
        .await
        .unwrap();
    assert_eq!(
        harness.notifier.calls()[0].custom_message.as_deref(),
        Some("Rescheduled by specialist")
    );
}

#[tokio::test]
async fn reschedule_rejects_closed_appointments_and_outsiders() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let outsider = harness.directory.add_client();
    let done = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Completed);
    let open = harness
        .appointments
        .seed(client, specialist, monday(), at(11, 0), at(12, 0), AppointmentStatus::Pending);
    let service = harness.booking();

    assert_matches!(
        service.reschedule(client, done.id, reschedule_to("14:00", "15:00", None)).await,
        Err(AppError::Precondition(_))
    );
    assert_matches!(
        service.reschedule(outsider, open.id, reschedule_to("14:00", "15:00", None)).await,
        Err(AppError::Permission(_))
    );
}
