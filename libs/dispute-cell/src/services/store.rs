use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{
    Dispute, DisputeError, DisputeResolution, DisputeScope, DisputeStatus, NewDispute, NewReview, Review,
    ReviewScope,
};

#[async_trait]
pub trait DisputeStore: Send + Sync {
    async fn get_dispute(&self, dispute_id: Uuid) -> Result<Option<Dispute>, AppError>;

    /// Newest first.
    async fn list_disputes(&self, scope: DisputeScope) -> Result<Vec<Dispute>, AppError>;

    async fn find_open(&self, appointment_id: Uuid, raised_by: Uuid) -> Result<Option<Dispute>, AppError>;

    async fn insert_dispute(&self, dispute: NewDispute) -> Result<Dispute, AppError>;

    async fn resolve_dispute(&self, dispute_id: Uuid, resolution: DisputeResolution) -> Result<Dispute, AppError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_review(&self, appointment_id: Uuid, reviewer_id: Uuid) -> Result<Option<Review>, AppError>;

    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError>;

    /// Newest first.
    async fn list_reviews(&self, scope: ReviewScope) -> Result<Vec<Review>, AppError>;
}

// ==============================================================================
// SUPABASE DISPUTES
// ==============================================================================

pub struct SupabaseDisputeStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseDisputeStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(&self.auth_token)
    }
}

#[async_trait]
impl DisputeStore for SupabaseDisputeStore {
    async fn get_dispute(&self, dispute_id: Uuid) -> Result<Option<Dispute>, AppError> {
        let path = format!("/rest/v1/disputes?id=eq.{}", dispute_id);
        Ok(self.supabase.fetch_optional(&path, self.token()).await?)
    }

    async fn list_disputes(&self, scope: DisputeScope) -> Result<Vec<Dispute>, AppError> {
        let filter = match scope {
            DisputeScope::All => String::new(),
            DisputeScope::RaisedBy(user_id) => format!("raised_by=eq.{}&", user_id),
        };
        let path = format!("/rest/v1/disputes?{}order=created_at.desc", filter);
        Ok(self.supabase.request(Method::GET, &path, self.token(), None).await?)
    }

    async fn find_open(&self, appointment_id: Uuid, raised_by: Uuid) -> Result<Option<Dispute>, AppError> {
        let path = format!(
            "/rest/v1/disputes?appointment_id=eq.{}&raised_by=eq.{}&status=eq.{}",
            appointment_id,
            raised_by,
            DisputeStatus::Open
        );
        Ok(self.supabase.fetch_optional(&path, self.token()).await?)
    }

    async fn insert_dispute(&self, dispute: NewDispute) -> Result<Dispute, AppError> {
        let body = serde_json::to_value(&dispute).map_err(|e| AppError::Internal(e.to_string()))?;
        let rows: Vec<Dispute> = self
            .supabase
            .returning(Method::POST, "/rest/v1/disputes", self.token(), body)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Dispute insert returned no row".to_string()))
    }

    async fn resolve_dispute(&self, dispute_id: Uuid, resolution: DisputeResolution) -> Result<Dispute, AppError> {
        let path = format!("/rest/v1/disputes?id=eq.{}", dispute_id);
        let body = json!({
            "status": DisputeStatus::Resolved,
            "resolution_notes": resolution.resolution_notes,
            "resolved_by": resolution.resolved_by,
            "resolved_at": resolution.resolved_at,
            "updated_at": Utc::now(),
        });
        let rows: Vec<Dispute> = self
            .supabase
            .returning(Method::PATCH, &path, self.token(), body)
            .await?;
        rows.into_iter().next().ok_or_else(|| DisputeError::NotFound.into())
    }
}

// ==============================================================================
// SUPABASE REVIEWS
// ==============================================================================

pub struct SupabaseReviewStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseReviewStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(&self.auth_token)
    }
}

#[async_trait]
impl ReviewStore for SupabaseReviewStore {
    async fn find_review(&self, appointment_id: Uuid, reviewer_id: Uuid) -> Result<Option<Review>, AppError> {
        let path = format!(
            "/rest/v1/reviews?appointment_id=eq.{}&reviewer_id=eq.{}",
            appointment_id, reviewer_id
        );
        Ok(self.supabase.fetch_optional(&path, self.token()).await?)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError> {
        let body = serde_json::to_value(&review).map_err(|e| AppError::Internal(e.to_string()))?;
        let rows: Vec<Review> = self
            .supabase
            .returning(Method::POST, "/rest/v1/reviews", self.token(), body)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Review insert returned no row".to_string()))
    }

    async fn list_reviews(&self, scope: ReviewScope) -> Result<Vec<Review>, AppError> {
        // Reviews only know their appointment; filter through the embedded row.
        let filter = match scope {
            ReviewScope::Specialist(id) => format!("appointments.specialist_id=eq.{}", id),
            ReviewScope::Client(id) => format!("appointments.client_id=eq.{}", id),
        };
        let path = format!(
            "/rest/v1/reviews?select=*,appointments!inner(client_id,specialist_id)&{}&order=created_at.desc",
            filter
        );
        Ok(self.supabase.request(Method::GET, &path, self.token(), None).await?)
    }
}
