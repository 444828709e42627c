//! In-memory dispute and review stores.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    Dispute, DisputeError, DisputeResolution, DisputeScope, DisputeStatus, NewDispute, NewReview, Review,
    ReviewScope,
};
use crate::services::{DisputeStore, ReviewStore};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct InMemoryDisputeStore {
    rows: Mutex<Vec<Dispute>>,
}

impl InMemoryDisputeStore {
    pub fn get(&self, dispute_id: Uuid) -> Option<Dispute> {
        guard(&self.rows).iter().find(|d| d.id == dispute_id).cloned()
    }

    pub fn all(&self) -> Vec<Dispute> {
        guard(&self.rows).clone()
    }
}

#[async_trait]
impl DisputeStore for InMemoryDisputeStore {
    async fn get_dispute(&self, dispute_id: Uuid) -> Result<Option<Dispute>, AppError> {
        Ok(self.get(dispute_id))
    }

    async fn list_disputes(&self, scope: DisputeScope) -> Result<Vec<Dispute>, AppError> {
        let mut rows: Vec<Dispute> = guard(&self.rows)
            .iter()
            .filter(|d| match scope {
                DisputeScope::All => true,
                DisputeScope::RaisedBy(user_id) => d.raised_by == user_id,
            })
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn find_open(&self, appointment_id: Uuid, raised_by: Uuid) -> Result<Option<Dispute>, AppError> {
        Ok(guard(&self.rows)
            .iter()
            .find(|d| d.appointment_id == appointment_id && d.raised_by == raised_by && d.status == DisputeStatus::Open)
            .cloned())
    }

    async fn insert_dispute(&self, dispute: NewDispute) -> Result<Dispute, AppError> {
        let stored = Dispute {
            id: Uuid::new_v4(),
            appointment_id: dispute.appointment_id,
            raised_by: dispute.raised_by,
            reason: dispute.reason,
            status: dispute.status,
            resolution_notes: None,
            resolved_by: None,
            resolved_at: None,
            created_at: Some(Utc::now()),
        };
        guard(&self.rows).push(stored.clone());
        Ok(stored)
    }

    async fn resolve_dispute(&self, dispute_id: Uuid, resolution: DisputeResolution) -> Result<Dispute, AppError> {
        let mut rows = guard(&self.rows);
        let row = rows
            .iter_mut()
            .find(|d| d.id == dispute_id)
            .ok_or(DisputeError::NotFound)?;
        row.status = DisputeStatus::Resolved;
        row.resolution_notes = Some(resolution.resolution_notes);
        row.resolved_by = Some(resolution.resolved_by);
        row.resolved_at = Some(resolution.resolved_at);
        Ok(row.clone())
    }
}

/// Reviews plus the appointment owners that scoped listing filters on.
#[derive(Default)]
pub struct InMemoryReviewStore {
    rows: Mutex<Vec<(Review, Uuid, Uuid)>>,
    owners: Mutex<Vec<(Uuid, Uuid, Uuid)>>,
}

impl InMemoryReviewStore {
    /// Registers which client and specialist an appointment belongs to.
    pub fn link(&self, appointment_id: Uuid, client_id: Uuid, specialist_id: Uuid) {
        guard(&self.owners).push((appointment_id, client_id, specialist_id));
    }

    pub fn all(&self) -> Vec<Review> {
        guard(&self.rows).iter().map(|(review, _, _)| review.clone()).collect()
    }

    fn owners_of(&self, appointment_id: Uuid) -> (Uuid, Uuid) {
        guard(&self.owners)
            .iter()
            .find(|(id, _, _)| *id == appointment_id)
            .map(|(_, client, specialist)| (*client, *specialist))
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn find_review(&self, appointment_id: Uuid, reviewer_id: Uuid) -> Result<Option<Review>, AppError> {
        Ok(guard(&self.rows)
            .iter()
            .map(|(review, _, _)| review)
            .find(|r| r.appointment_id == appointment_id && r.reviewer_id == reviewer_id)
            .cloned())
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError> {
        let (client_id, specialist_id) = self.owners_of(review.appointment_id);
        let stored = Review {
            id: Uuid::new_v4(),
            appointment_id: review.appointment_id,
            reviewer_id: review.reviewer_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Some(Utc::now()),
        };
        guard(&self.rows).push((stored.clone(), client_id, specialist_id));
        Ok(stored)
    }

    async fn list_reviews(&self, scope: ReviewScope) -> Result<Vec<Review>, AppError> {
        let mut rows: Vec<Review> = guard(&self.rows)
            .iter()
            .filter(|(_, client, specialist)| match scope {
                ReviewScope::Specialist(id) => *specialist == id,
                ReviewScope::Client(id) => *client == id,
            })
            .map(|(review, _, _)| review.clone())
            .collect();
        rows.reverse();
        Ok(rows)
    }
}
