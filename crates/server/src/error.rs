//! Unified error handling for the API.
//!
//! Every failure leaves a handler as `{ "error": "<message>" }` with a status
//! code. Server-side failures are reported to Sentry and answered with a
//! generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::google::GoogleError;
use crate::services::{AuthError, EnrollmentError};
use crate::wordpress::WordPressError;

/// Shown in place of transport and decoding failures from vendor APIs.
pub const UPSTREAM_UNAVAILABLE: &str = "upstream service unavailable";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// WordPress/WooCommerce/Tutor call failed.
    #[error("WordPress error: {0}")]
    WordPress(#[from] WordPressError),

    /// Google Directory call failed.
    #[error("Google error: {0}")]
    Google(#[from] GoogleError),

    /// Enrollment workflow failed.
    #[error("{0}")]
    Enrollment(#[from] EnrollmentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The integration behind this route has no configuration.
    #[error("{0} integration not configured")]
    NotConfigured(&'static str),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => match e {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Invalid(_) => StatusCode::BAD_REQUEST,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(e) => match e {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::WordPress(WordPressError::NotFound(_))
            | Self::Google(GoogleError::NotFound(_))
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Enrollment(EnrollmentError::InvalidRequest(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Enrollment(EnrollmentError::Order {
                source: WordPressError::NotFound(_),
                ..
            }) => StatusCode::NOT_FOUND,
            Self::WordPress(_) | Self::Google(_) | Self::Enrollment(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(m) | RepositoryError::Invalid(m)) => {
                m.clone()
            }
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash) => {
                "Internal server error".to_string()
            }
            Self::Auth(e) => e.to_string(),
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::BadRequest(m)
            | Self::Conflict(m) => m.clone(),
            Self::WordPress(e) => format!("WordPress error: {}", e.public_message()),
            Self::Google(e) => format!("Google error: {}", e.public_message()),
            Self::Enrollment(e) => e.public_message(),
            Self::NotConfigured(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: deskops_core::UserId, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
