use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
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
    ActionResponse, Appointment, BookAppointmentRequest, BookingResponse, CancelRequest,
    RescheduleRequest, SlotListing, SlotQuery, StatusUpdateResponse, UpdateStatusRequest,
};
use crate::services::{BookingService, PaymentService};

const SIGNATURE_HEADER: &str = "stripe-signature";

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let Json(request) = payload?;
    let service = BookingService::from_config(&state, auth.token());
    let booking = service.book_appointment(user.user_id()?, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let service = BookingService::from_config(&state, auth.token());
    Ok(Json(service.list_appointments(user.user_id()?).await?))
}

#[axum::debug_handler]
pub async fn available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    query: Result<Query<SlotQuery>, QueryRejection>,
) -> Result<Json<SlotListing>, AppError> {
    let Query(query) = query?;
    let service = BookingService::from_config(&state, auth.token());
    Ok(Json(service.available_slots(query).await?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Appointment>, AppError> {
    let Path(appointment_id) = path?;
    let service = BookingService::from_config(&state, auth.token());
    Ok(Json(service.get_appointment(user.user_id()?, appointment_id).await?))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let Path(appointment_id) = path?;
    let Json(request) = payload?;
    let service = BookingService::from_config(&state, auth.token());
    let updated = service
        .update_status(user.user_id()?, appointment_id, request.status)
        .await?;
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let Path(appointment_id) = path?;
    let Json(request) = payload?;
    let service = BookingService::from_config(&state, auth.token());
    Ok(Json(service.reschedule(user.user_id()?, appointment_id, request).await?))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Option<Json<CancelRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let Path(appointment_id) = path?;
    let reason = payload.and_then(|Json(request)| request.reason);
    let service = BookingService::from_config(&state, auth.token());
    Ok(Json(service.cancel_with_reason(user.user_id()?, appointment_id, reason).await?))
}

// ==============================================================================
// PAYMENT HANDLERS
// ==============================================================================

/// Gateway callback. Authenticated by signature, not by a user token.
#[axum::debug_handler]
pub async fn payment_webhook(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing stripe-signature header".to_string()))?;

    let service = PaymentService::from_config(&state, state.service_token());
    let outcome = service.handle_webhook(&body, signature).await?;

    Ok(Json(json!({
        "received": true,
        "outcome": outcome,
    })))
}
