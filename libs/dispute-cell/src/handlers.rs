use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use appointment_cell::models::ActionResponse;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateDisputeRequest, CreateReviewRequest, Dispute, DisputeCreated, ResolveDisputeRequest, Review,
    ReviewCreated, ReviewQuery,
};
use crate::services::{DisputeService, ReviewService};

// ==============================================================================
// DISPUTE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_dispute(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    payload: Result<Json<CreateDisputeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DisputeCreated>), AppError> {
    let Json(request) = payload?;
    let service = DisputeService::from_config(&state, auth.token());
    let created = service.create_dispute(user.user_id()?, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn list_disputes(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Dispute>>, AppError> {
    let service = DisputeService::from_config(&state, auth.token());
    Ok(Json(service.list_disputes(user.user_id()?).await?))
}

#[axum::debug_handler]
pub async fn resolve_dispute(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ResolveDisputeRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let Path(dispute_id) = path?;
    let Json(request) = payload?;
    let service = DisputeService::from_config(&state, auth.token());
    Ok(Json(service.resolve_dispute(user.user_id()?, dispute_id, request).await?))
}

// ==============================================================================
// REVIEW HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_review(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewCreated>), AppError> {
    let Json(request) = payload?;
    let service = ReviewService::from_config(&state, auth.token());
    let created = service.create_review(user.user_id()?, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn list_reviews(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    query: Result<Query<ReviewQuery>, QueryRejection>,
) -> Result<Json<Vec<Review>>, AppError> {
    let Query(query) = query?;
    let service = ReviewService::from_config(&state, auth.token());
    Ok(Json(service.list_reviews(user.user_id()?, query).await?))
}
