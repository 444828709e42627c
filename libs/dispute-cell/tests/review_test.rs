mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use dispute_cell::models::{CreateReviewRequest, ReviewQuery};
use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;

use common::Harness;

fn review(appointment_id: Uuid, rating: i64, comment: Option<&str>) -> CreateReviewRequest {
    CreateReviewRequest {
        appointment_id: Some(appointment_id),
        rating: Some(rating),
        comment: comment.map(str::to_string),
    }
}

#[tokio::test]
async fn completed_appointment_is_reviewed_exactly_once() {
    let harness = Harness::new();
    let appointment = harness.appointment(AppointmentStatus::Completed);
    let service = harness.review_service();

    let created = service
        .create_review(appointment.client_id, review(appointment.id, 5, Some("Fixed in ten minutes")))
        .await
        .unwrap();

    let stored = harness.reviews.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, created.review_id);
    assert_eq!(stored[0].rating, 5);
    assert_eq!(stored[0].comment.as_deref(), Some("Fixed in ten minutes"));

    let again = service
        .create_review(appointment.client_id, review(appointment.id, 4, None))
        .await;
    assert_matches!(again, Err(AppError::Precondition(_)));

    let entries = harness.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "review_created");
    assert_eq!(entries[0].metadata["has_comment"], true);
    assert_eq!(entries[0].metadata["specialist_id"], appointment.specialist_id.to_string());
}

#[tokio::test]
async fn unfinished_appointments_cannot_be_reviewed() {
    let harness = Harness::new();
    let service = harness.review_service();

    for status in [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
    ] {
        let appointment = harness.appointment(status);
        let result = service
            .create_review(appointment.client_id, review(appointment.id, 3, None))
            .await;
        assert_matches!(result, Err(AppError::Precondition(_)), "{}", status);
    }
    assert!(harness.reviews.all().is_empty());
}

#[tokio::test]
async fn only_the_client_reviews() {
    let harness = Harness::new();
    let appointment = harness.appointment(AppointmentStatus::Completed);
    let service = harness.review_service();

    for caller in [
        appointment.specialist_id,
        harness.directory.add_admin(),
        harness.directory.add_client(),
    ] {
        let result = service.create_review(caller, review(appointment.id, 5, None)).await;
        assert_matches!(result, Err(AppError::Permission(_)));
    }
}

#[tokio::test]
async fn rating_must_be_one_to_five() {
    let harness = Harness::new();
    let appointment = harness.appointment(AppointmentStatus::Completed);
    let service = harness.review_service();

    for rating in [0, 6, -1] {
        let result = service
            .create_review(appointment.client_id, review(appointment.id, rating, None))
            .await;
        assert_matches!(result, Err(AppError::Input(_)), "rating {}", rating);
    }

    let missing = service
        .create_review(
            appointment.client_id,
            CreateReviewRequest {
                appointment_id: Some(appointment.id),
                ..CreateReviewRequest::default()
            },
        )
        .await;
    assert_matches!(missing, Err(AppError::Input(_)));

    service
        .create_review(appointment.client_id, review(appointment.id, 1, Some("  ")))
        .await
        .unwrap();
    assert_eq!(harness.reviews.all()[0].comment, None);
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let harness = Harness::new();
    let client = harness.directory.add_client();

    let result = harness
        .review_service()
        .create_review(client, review(Uuid::new_v4(), 4, None))
        .await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn listing_by_specialist_or_own() {
    let harness = Harness::new();
    let first = harness.appointment(AppointmentStatus::Completed);
    let second = harness.appointment(AppointmentStatus::Completed);
    let service = harness.review_service();

    service
        .create_review(first.client_id, review(first.id, 5, None))
        .await
        .unwrap();
    service
        .create_review(second.client_id, review(second.id, 2, Some("Arrived late")))
        .await
        .unwrap();

    let for_specialist = service
        .list_reviews(
            second.client_id,
            ReviewQuery {
                specialist_id: Some(first.specialist_id),
            },
        )
        .await
        .unwrap();
    assert_eq!(for_specialist.len(), 1);
    assert_eq!(for_specialist[0].appointment_id, first.id);

    let own = service.list_reviews(second.client_id, ReviewQuery::default()).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].rating, 2);
}
