//! Error handling module for the folio backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.
//! Write and subscription failures carry only a generic, user-facing message; the
//! underlying cause is logged where it happens.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::db::StoreError;
use crate::intake::IntakeError;
use crate::roster::RosterError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const WRITE_ERROR: &str = "WRITE_ERROR";
    pub const SUBSCRIPTION_ERROR: &str = "SUBSCRIPTION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Generic messages shown to users.
pub mod messages {
    pub const SUBMIT_FAILED: &str =
        "Failed to submit form. Please check your connection or try again later.";
    pub const DELETE_FAILED: &str = "Failed to delete submission. Please try again later.";
    pub const DELETE_ALL_FAILED: &str = "Failed to delete all submissions. Please try again later.";
    pub const FETCH_FAILED: &str =
        "Failed to fetch submissions. Please check your connection or try again later.";
    pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";
    pub const INTERNAL: &str = "An error occurred. Please try again.";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Sign-in rejected or session missing
    Unauthorized(String),
    /// Required field missing or not an allowed value
    Validation(String),
    /// Create or delete request failed
    Write(String),
    /// Standing query failed to establish or was interrupted
    Subscription(String),
    /// Operation not allowed in the current state
    Conflict(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Write(_) => StatusCode::BAD_GATEWAY,
            AppError::Subscription(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Write(_) => codes::WRITE_ERROR,
            AppError::Subscription(_) => codes::SUBSCRIPTION_ERROR,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Write(msg) => msg.clone(),
            AppError::Subscription(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store error: {}", err);
        AppError::Internal(messages::INTERNAL.to_string())
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Validation(msg) => AppError::Validation(msg),
            IntakeError::Write => AppError::Write(messages::SUBMIT_FAILED.to_string()),
        }
    }
}

impl From<RosterError> for AppError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Subscription => AppError::Subscription(messages::FETCH_FAILED.to_string()),
            RosterError::Write => AppError::Write(messages::DELETE_FAILED.to_string()),
            RosterError::BulkListing | RosterError::PartialDelete { .. } => {
                AppError::Write(messages::DELETE_ALL_FAILED.to_string())
            }
            RosterError::NotOpen => AppError::Conflict("Roster is not open".to_string()),
            RosterError::AlreadyOpened => {
                AppError::Conflict("Roster has already been opened".to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                AppError::Validation("Email and password are required".to_string())
            }
            AuthError::InvalidCredentials | AuthError::Disabled => {
                AppError::Unauthorized(messages::INVALID_CREDENTIALS.to_string())
            }
            AuthError::InvalidSession => {
                AppError::Unauthorized("Missing or invalid session token".to_string())
            }
        }
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: i64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: i64) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
            revision_id,
        }
    }
}

/// Wrapper type for errors that carry revision_id context.
pub struct AppErrorWithRevision {
    pub error: AppError,
    pub revision_id: i64,
}

impl IntoResponse for AppErrorWithRevision {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.revision_id);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_delete_is_reported_generically() {
        let err: AppError = RosterError::PartialDelete {
            deleted: 2,
            failed: 1,
        }
        .into();
        assert_eq!(err.error_code(), codes::WRITE_ERROR);
        assert_eq!(err.message(), messages::DELETE_ALL_FAILED);
        assert!(!err.message().contains('2'));
    }

    #[test]
    fn test_auth_rejections_share_one_message() {
        let wrong: AppError = AuthError::InvalidCredentials.into();
        let disabled: AppError = AuthError::Disabled.into();
        assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.message(), disabled.message());
    }

    #[test]
    fn test_store_error_hides_cause() {
        let err: AppError = StoreError::NotFound("secret-id".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("secret-id"));
    }

    #[test]
    fn test_bulk_listing_failure_uses_bulk_message() {
        let err: AppError = RosterError::BulkListing.into();
        assert_eq!(err.error_code(), codes::WRITE_ERROR);
        assert_eq!(err.message(), messages::DELETE_ALL_FAILED);
    }
}
