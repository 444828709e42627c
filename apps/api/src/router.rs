use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::{appointment_routes, payment_routes};
use dispute_cell::router::{dispute_routes, review_routes};
use notification_cell::router::{cron_routes, notification_routes};
use shared_config::AppConfig;
use specialist_cell::router::{availability_routes, specialist_routes};

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "H.I.T.S. API is running!" }))
        .nest("/specialists", specialist_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/disputes", dispute_routes(state.clone()))
        .nest("/reviews", review_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/cron", cron_routes(state))
}
