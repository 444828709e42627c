mod common;

use assert_matches::assert_matches;
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::models::{PaymentStatus, WebhookOutcome};
use appointment_cell::testing::FakeGateway;
use notification_cell::models::NotificationEvent;
use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;

use common::{at, monday, request, Harness};

fn event(kind: &str, metadata: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": kind,
        "data": { "object": {
            "id": "cs_test_session",
            "payment_intent": "pi_test_intent",
            "metadata": metadata
        } }
    }))
    .unwrap()
}

fn booking_metadata(appointment_id: Uuid, payment_id: Uuid) -> Value {
    json!({ "appointment_id": appointment_id, "payment_id": payment_id })
}

async fn deliver(harness: &Harness, payload: &[u8]) -> Result<WebhookOutcome, AppError> {
    harness
        .payment_service()
        .handle_webhook(payload, &FakeGateway::sign(payload))
        .await
}

#[tokio::test]
async fn completed_checkout_confirms_once() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let booking = harness
        .booking()
        .book_appointment(client, request(specialist, monday(), "10:00", "11:00"))
        .await
        .unwrap();
    let payload = event(
        "checkout.session.completed",
        booking_metadata(booking.appointment_id, booking.payment_id),
    );

    assert_eq!(deliver(&harness, &payload).await.unwrap(), WebhookOutcome::Confirmed);
    assert_eq!(deliver(&harness, &payload).await.unwrap(), WebhookOutcome::AlreadyConfirmed);

    let appointment = harness.appointments.get(booking.appointment_id).unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    let payment = harness.payments.get(booking.payment_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.gateway_reference.as_deref(), Some("pi_test_intent"));

    assert_eq!(harness.payments.mark_paid_calls(), 1);
    assert_eq!(harness.notifier.count(NotificationEvent::Confirmation), 1);
}

#[tokio::test]
async fn confirmed_slot_still_blocks_new_bookings() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let service = harness.booking();
    let booking = service
        .book_appointment(client, request(specialist, monday(), "10:00", "11:00"))
        .await
        .unwrap();
    let payload = event(
        "checkout.session.completed",
        booking_metadata(booking.appointment_id, booking.payment_id),
    );
    deliver(&harness, &payload).await.unwrap();

    let again = service
        .book_appointment(harness.directory.add_client(), request(specialist, monday(), "10:30", "11:30"))
        .await;
    assert_matches!(again, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn payment_for_cancelled_appointment_is_recorded_without_reopening() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Cancelled);
    let payment = harness.payments.seed(appointment.id, 50.0, PaymentStatus::Pending);

    let outcome = deliver(
        &harness,
        &event("checkout.session.completed", booking_metadata(appointment.id, payment.id)),
    )
    .await
    .unwrap();

    assert_eq!(outcome, WebhookOutcome::PaidForClosedAppointment);
    assert_eq!(harness.appointments.get(appointment.id).unwrap().status, AppointmentStatus::Cancelled);
    assert_eq!(harness.payments.get(payment.id).unwrap().status, PaymentStatus::Paid);
    assert!(harness.notifier.calls().is_empty());
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_webhook() {
    let harness = Harness::with(
        FakeGateway::default(),
        notification_cell::testing::RecordingNotifier::failing(),
    );
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Pending);
    let payment = harness.payments.seed(appointment.id, 50.0, PaymentStatus::Pending);

    let outcome = deliver(
        &harness,
        &event("checkout.session.completed", booking_metadata(appointment.id, payment.id)),
    )
    .await;

    assert_eq!(outcome.unwrap(), WebhookOutcome::Confirmed);
    assert_eq!(harness.appointments.get(appointment.id).unwrap().status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn expired_session_releases_the_payment() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Pending);
    let payment = harness.payments.seed(appointment.id, 50.0, PaymentStatus::Pending);

    let outcome = deliver(
        &harness,
        &event("checkout.session.expired", booking_metadata(appointment.id, payment.id)),
    )
    .await
    .unwrap();

    assert_eq!(outcome, WebhookOutcome::PaymentReleased);
    assert_eq!(harness.payments.get(payment.id).unwrap().status, PaymentStatus::Pending);
    assert_eq!(harness.appointments.get(appointment.id).unwrap().status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn expiry_after_payment_is_ignored() {
    let harness = Harness::new();
    let appointment_id = Uuid::new_v4();
    let payment = harness.payments.seed(appointment_id, 50.0, PaymentStatus::Paid);

    let outcome = deliver(
        &harness,
        &event("checkout.session.expired", booking_metadata(appointment_id, payment.id)),
    )
    .await
    .unwrap();

    assert_eq!(outcome, WebhookOutcome::Ignored);
    assert_eq!(harness.payments.get(payment.id).unwrap().status, PaymentStatus::Paid);

    let bare = deliver(&harness, &event("checkout.session.expired", json!({}))).await;
    assert_eq!(bare.unwrap(), WebhookOutcome::Ignored);
}

#[tokio::test]
async fn completed_without_metadata_is_rejected() {
    let harness = Harness::new();
    let payment = harness.payments.seed(Uuid::new_v4(), 50.0, PaymentStatus::Pending);

    let missing_payment = deliver(
        &harness,
        &event("checkout.session.completed", json!({ "appointment_id": Uuid::new_v4() })),
    )
    .await;
    assert_matches!(missing_payment, Err(AppError::Input(_)));

    let missing_all = deliver(&harness, &event("checkout.session.completed", json!({}))).await;
    assert_matches!(missing_all, Err(AppError::Input(_)));

    assert_eq!(harness.payments.get(payment.id).unwrap().status, PaymentStatus::Pending);
}

#[tokio::test]
async fn mismatched_metadata_is_rejected() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Pending);
    let other = harness
        .appointments
        .seed(client, specialist, monday(), at(11, 0), at(12, 0), AppointmentStatus::Pending);
    let payment = harness.payments.seed(appointment.id, 50.0, PaymentStatus::Pending);

    let result = deliver(
        &harness,
        &event("checkout.session.completed", booking_metadata(other.id, payment.id)),
    )
    .await;

    assert_matches!(result, Err(AppError::Input(_)));
    assert_eq!(harness.payments.get(payment.id).unwrap().status, PaymentStatus::Pending);
    assert_eq!(harness.appointments.get(other.id).unwrap().status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn unknown_payment_is_not_found() {
    let harness = Harness::new();

    let result = deliver(
        &harness,
        &event(
            "checkout.session.completed",
            booking_metadata(Uuid::new_v4(), Uuid::new_v4()),
        ),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn bad_signature_changes_nothing() {
    let harness = Harness::new();
    let specialist = harness.monday_specialist(None);
    let client = harness.directory.add_client();
    let appointment = harness
        .appointments
        .seed(client, specialist, monday(), at(9, 0), at(10, 0), AppointmentStatus::Pending);
    let payment = harness.payments.seed(appointment.id, 50.0, PaymentStatus::Pending);
    let payload = event("checkout.session.completed", booking_metadata(appointment.id, payment.id));
    let signed_for_other_body = FakeGateway::sign(b"{}");

    let result = harness
        .payment_service()
        .handle_webhook(&payload, &signed_for_other_body)
        .await;
    assert_matches!(result, Err(AppError::Auth(_)));

    let unsigned = harness.payment_service().handle_webhook(&payload, "").await;
    assert_matches!(unsigned, Err(AppError::Auth(_)));

    assert_eq!(harness.appointments.get(appointment.id).unwrap().status, AppointmentStatus::Pending);
    assert_eq!(harness.payments.mark_paid_calls(), 0);
}

#[tokio::test]
async fn other_event_types_are_acknowledged() {
    let harness = Harness::new();

    let outcome = deliver(&harness, &event("payment_intent.created", json!({}))).await;

    assert_eq!(outcome.unwrap(), WebhookOutcome::Ignored);
    assert!(harness.notifier.calls().is_empty());
}
