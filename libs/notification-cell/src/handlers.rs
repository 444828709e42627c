use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::bearer_token;

use crate::models::{NotificationReport, SendNotificationRequest};
use crate::services::{NotificationService, Notifier, ReminderService};

fn check_cron_secret(config: &AppConfig, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = config.cron_secret.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    if bearer_token(headers)? != secret {
        warn!("Rejected reminder job call with a wrong cron secret");
        return Err(AppError::Auth("Unauthorized".to_string()));
    }
    Ok(())
}

/// Direct notification calls come from trusted services holding either the
/// service-role key or the cron secret.
fn check_internal_caller(config: &AppConfig, headers: &HeaderMap) -> Result<(), AppError> {
    let token = bearer_token(headers)?;
    let trusted = [
        Some(config.supabase_service_role_key.as_str()),
        config.cron_secret.as_deref(),
    ];

    if trusted.into_iter().flatten().any(|secret| !secret.is_empty() && secret == token) {
        return Ok(());
    }
    warn!("Rejected notification call from an untrusted caller");
    Err(AppError::Auth("Unauthorized".to_string()))
}

#[axum::debug_handler]
pub async fn send_appointment_notification(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<Json<NotificationReport>, AppError> {
    check_internal_caller(&state, &headers)?;
    let Json(request) = payload?;

    let (Some(appointment_id), Some(event)) = (request.appointment_id, request.notification_type) else {
        return Err(AppError::Input(
            "Missing required fields: appointment_id and notification_type".to_string(),
        ));
    };

    let service = NotificationService::from_config(&state, state.service_token());
    let report = service
        .notify(appointment_id, event, request.custom_message.as_deref())
        .await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn send_reminders(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    check_cron_secret(&state, &headers)?;

    let service = ReminderService::from_config(&state, state.service_token());
    let report = service.run(Utc::now().date_naive()).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Processed {} appointments", report.appointments_processed),
        "results": report,
    })))
}
