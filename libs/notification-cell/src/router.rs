use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

/// Scheduled jobs. Guarded by the cron secret, not by user tokens.
pub fn cron_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/send-reminders", get(handlers::send_reminders))
        .with_state(state)
}

/// Service-to-service entry point for the notifier.
pub fn notification_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointment", post(handlers::send_appointment_notification))
        .with_state(state)
}
