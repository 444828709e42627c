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
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityQuery, AvailabilityWindow, CreateAvailabilityRequest, SpecialistListQuery,
    SpecialistSummary, UpdateAvailabilityRequest, VerificationRequest,
};
use crate::services::{AvailabilityService, SpecialistService};

// ==============================================================================
// SPECIALIST HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_specialists(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    query: Result<Query<SpecialistListQuery>, QueryRejection>,
) -> Result<Json<Vec<SpecialistSummary>>, AppError> {
    let Query(query) = query?;
    let service = SpecialistService::from_config(&state, auth.token());
    let specialists = service.list_specialists(query.date).await?;
    Ok(Json(specialists))
}

#[axum::debug_handler]
pub async fn set_verification(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(specialist_id) = path?;
    let Json(request) = payload?;
    let service = SpecialistService::from_config(&state, auth.token());
    let profile = service
        .set_verification(user.user_id()?, specialist_id, request.verified)
        .await?;

    Ok(Json(json!({
        "success": true,
        "specialist": profile,
    })))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<Vec<AvailabilityWindow>>, AppError> {
    let Query(query) = query?;
    let service = AvailabilityService::from_config(&state, auth.token());
    let windows = service
        .list_availability(user.user_id()?, query.specialist_id)
        .await?;
    Ok(Json(windows))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    payload: Result<Json<CreateAvailabilityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AvailabilityWindow>), AppError> {
    let Json(request) = payload?;
    let service = AvailabilityService::from_config(&state, auth.token());
    let window = service.create_availability(user.user_id()?, request).await?;
    Ok((StatusCode::CREATED, Json(window)))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateAvailabilityRequest>, JsonRejection>,
) -> Result<Json<AvailabilityWindow>, AppError> {
    let Path(window_id) = path?;
    let Json(request) = payload?;
    let service = AvailabilityService::from_config(&state, auth.token());
    let window = service
        .update_availability(user.user_id()?, window_id, request)
        .await?;
    Ok(Json(window))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(window_id) = path?;
    let service = AvailabilityService::from_config(&state, auth.token());
    service.delete_availability(user.user_id()?, window_id).await?;
    Ok(Json(json!({ "success": true })))
}
