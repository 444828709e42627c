use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::AppointmentError;
use appointment_cell::services::{AppointmentStore, SupabaseAppointmentStore};
use shared_config::AppConfig;
use shared_database::audit::{AuditEntry, AuditLog, SupabaseAuditLog};
use shared_database::supabase::SupabaseClient;
use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;

use crate::models::{
    CreateReviewRequest, DisputeError, NewReview, Review, ReviewCreated, ReviewQuery, ReviewScope, MAX_RATING,
    MIN_RATING,
};
use crate::services::store::{ReviewStore, SupabaseReviewStore};

pub struct ReviewService {
    appointments: Arc<dyn AppointmentStore>,
    reviews: Arc<dyn ReviewStore>,
    audit: Arc<dyn AuditLog>,
}

impl ReviewService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        reviews: Arc<dyn ReviewStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            appointments,
            reviews,
            audit,
        }
    }

    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseAppointmentStore::new(supabase.clone(), auth_token)),
            Arc::new(SupabaseReviewStore::new(supabase.clone(), auth_token)),
            Arc::new(SupabaseAuditLog::new(supabase, auth_token)),
        )
    }

    pub async fn create_review(&self, caller_id: Uuid, request: CreateReviewRequest) -> Result<ReviewCreated, AppError> {
        let (appointment_id, rating) = match (request.appointment_id, request.rating) {
            (Some(appointment_id), Some(rating)) => (appointment_id, rating),
            _ => return Err(DisputeError::MissingFields("appointment_id and rating").into()),
        };
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(DisputeError::RatingOutOfRange.into());
        }
        let comment = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let appointment = self
            .appointments
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if appointment.client_id != caller_id {
            return Err(DisputeError::NotTheClient.into());
        }
        if appointment.status != AppointmentStatus::Completed {
            return Err(DisputeError::NotReviewable(appointment.status).into());
        }
        if self.reviews.find_review(appointment_id, caller_id).await?.is_some() {
            debug!("Client {} already reviewed {}", caller_id, appointment_id);
            return Err(DisputeError::DuplicateReview.into());
        }

        let has_comment = comment.is_some();
        let review = self
            .reviews
            .insert_review(NewReview {
                appointment_id,
                reviewer_id: caller_id,
                rating,
                comment,
            })
            .await?;
        info!("Review {} ({} stars) left on appointment {}", review.id, rating, appointment_id);

        self.audit
            .record(AuditEntry::new(
                "review_created",
                Some(caller_id),
                json!({
                    "appointment_id": appointment_id,
                    "specialist_id": appointment.specialist_id,
                    "rating": rating,
                    "has_comment": has_comment,
                }),
            ))
            .await;

        Ok(ReviewCreated { review_id: review.id })
    }

    /// A specialist's reviews when one is named, otherwise those the caller wrote.
    pub async fn list_reviews(&self, caller_id: Uuid, query: ReviewQuery) -> Result<Vec<Review>, AppError> {
        let scope = match query.specialist_id {
            Some(specialist_id) => ReviewScope::Specialist(specialist_id),
            None => ReviewScope::Client(caller_id),
        };
        self.reviews.list_reviews(scope).await
    }
}
