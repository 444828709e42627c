use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn dispute_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_disputes).post(handlers::create_dispute))
        .route("/{dispute_id}/resolve", patch(handlers::resolve_dispute))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn review_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_reviews).post(handlers::create_review))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
