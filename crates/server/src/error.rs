//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Every error renders as
//! `{"status": false, "errors": {...}}`; server-side failures are captured to
//! Sentry before responding and their details are not exposed to clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{FieldError, ServiceError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business rule or storage failure from the service layer.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Missing, malformed or unknown auth token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request (body is not JSON, bad query string).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        Self::Service(ServiceError::Repository(e))
    }
}

impl From<FieldError> for AppError {
    fn from(e: FieldError) -> Self {
        Self::Service(ServiceError::Validation(e))
    }
}

impl AppError {
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Service(ServiceError::Repository(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
                ))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::Validation(_) | ServiceError::StateConflict { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ServiceError::NotFound(_) | ServiceError::Repository(RepositoryError::NotFound) => {
                    StatusCode::NOT_FOUND
                }
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn errors(&self) -> Value {
        if self.is_server_error() {
            // Don't expose internal error details to clients
            return json!({ "detail": "Internal server error" });
        }

        match self {
            Self::Service(ServiceError::Validation(field)) => json!(field),
            Self::Service(ServiceError::StateConflict {
                order_id,
                expected,
                current,
            }) => json!({
                "detail": self.to_string(),
                "order_id": order_id,
                "expected_state": expected,
                "current_state": current,
            }),
            Self::Service(ServiceError::NotFound(what)) => {
                json!({ "detail": format!("{what} not found") })
            }
            Self::Service(ServiceError::Forbidden(reason)) => json!({ "detail": reason }),
            Self::Service(ServiceError::Repository(err)) => json!({ "detail": err.to_string() }),
            Self::Unauthorized(reason) | Self::BadRequest(reason) | Self::Internal(reason) => {
                json!({ "detail": reason })
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({ "status": false, "errors": self.errors() });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after a token was resolved.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
