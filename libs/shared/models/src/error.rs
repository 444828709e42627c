use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {message}")]
    Upstream { message: String, retryable: bool },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(message: impl Into<String>, retryable: bool) -> Self {
        AppError::Upstream {
            message: message.into(),
            retryable,
        }
    }

    /// Stable machine-readable kind carried in every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Input(_) => "input_error",
            AppError::Auth(_) => "auth_error",
            AppError::Permission(_) => "permission_error",
            AppError::NotFound(_) => "not_found",
            AppError::Precondition(_) => "precondition_failed",
            AppError::Conflict(_) => "conflict",
            AppError::Upstream { .. } => "upstream_error",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Input(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Permission(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Precondition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream { retryable: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { retryable: false, .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Upstream { retryable: true, .. })
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Input(msg)
            | AppError::Auth(msg)
            | AppError::Permission(msg)
            | AppError::NotFound(msg)
            | AppError::Precondition(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Upstream { message, .. } => message.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Error: {} ({}): {}", status, self.kind(), self);
        } else {
            tracing::warn!("Request rejected: {} ({}): {}", status, self.kind(), self);
        }

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.public_message(),
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Input(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Input(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Input(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_its_status() {
        let cases = [
            (AppError::Input("x".into()), "input_error", 400),
            (AppError::Auth("x".into()), "auth_error", 401),
            (AppError::Permission("x".into()), "permission_error", 403),
            (AppError::NotFound("x".into()), "not_found", 404),
            (AppError::Precondition("x".into()), "precondition_failed", 422),
            (AppError::Conflict("x".into()), "conflict", 409),
            (AppError::upstream("x", false), "upstream_error", 502),
            (AppError::upstream("x", true), "upstream_error", 503),
            (AppError::Internal("x".into()), "internal", 500),
        ];

        for (error, kind, status) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.status_code().as_u16(), status);
        }
    }

    #[test]
    fn internal_details_stay_out_of_the_body() {
        let error = AppError::Internal("connection string leaked".to_string());
        assert_eq!(error.public_message(), "Internal server error");

        let error = AppError::Conflict("Time slot is already booked".to_string());
        assert_eq!(error.public_message(), "Time slot is already booked");
    }

    #[test]
    fn only_retryable_upstream_errors_are_retryable() {
        assert!(AppError::upstream("timeout", true).is_retryable());
        assert!(!AppError::upstream("card declined", false).is_retryable());
        assert!(!AppError::Internal("x".into()).is_retryable());
    }
}
