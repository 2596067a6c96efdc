//! Admin authentication.
//!
//! Credentials are checked with constant-time comparison to mitigate timing attacks.
//! A successful sign-in yields an opaque session token carried on later requests.

mod sessions;

pub use sessions::*;

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::db::Collection;
use crate::errors::{AppError, AppErrorWithRevision};

/// Header name for the session token.
pub const SESSION_HEADER: &str = "x-session-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Email or password left blank
    MissingCredentials,
    /// Wrong email or password
    InvalidCredentials,
    /// No admin password configured
    Disabled,
    /// Token missing, unknown or signed out
    InvalidSession,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => f.write_str("missing credentials"),
            AuthError::InvalidCredentials => f.write_str("invalid credentials"),
            AuthError::Disabled => f.write_str("admin login disabled"),
            AuthError::InvalidSession => f.write_str("invalid session"),
        }
    }
}

impl std::error::Error for AuthError {}

/// The configured administrator account.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    email: String,
    password: Option<String>,
}

impl AdminCredentials {
    pub fn new(email: impl Into<String>, password: Option<String>) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    /// Check a sign-in attempt.
    pub fn verify(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let Some(expected) = self.password.as_deref() else {
            return Err(AuthError::Disabled);
        };

        // Evaluate both so a wrong email costs the same as a wrong password
        let email_ok = constant_time_compare(&email.trim().to_lowercase(), &self.email.to_lowercase());
        let password_ok = constant_time_compare(password, expected);

        if email_ok && password_ok {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Session token of an authenticated request, set by `session_auth_layer`.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Read the session token from `x-session-token` or a bearer Authorization header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let direct = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    if direct.is_some() {
        return direct;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Session authentication layer; rejects requests without a live session.
pub async fn session_auth_layer<C: Collection>(
    sessions: Arc<SessionRegistry<C>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return unauthorized_response();
    };

    if !sessions.is_authenticated(&token).await {
        return unauthorized_response();
    }

    request.extensions_mut().insert(SessionToken(token));
    next.run(request).await
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}

fn unauthorized_response() -> Response {
    AppErrorWithRevision {
        error: AppError::from(AuthError::InvalidSession),
        revision_id: 0,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminCredentials {
        AdminCredentials::new("admin@example.com", Some("hunter2".to_string()))
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_verify_accepts_configured_account() {
        assert_eq!(admin().verify("admin@example.com", "hunter2"), Ok(()));
        assert_eq!(admin().verify("  Admin@Example.com ", "hunter2"), Ok(()));
    }

    #[test]
    fn test_verify_rejects_wrong_email_or_password_alike() {
        assert_eq!(
            admin().verify("other@example.com", "hunter2"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            admin().verify("admin@example.com", "hunter3"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_verify_requires_both_fields() {
        assert_eq!(
            admin().verify("", "hunter2"),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            admin().verify("admin@example.com", ""),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_verify_without_password_is_disabled() {
        let admin = AdminCredentials::new("admin@example.com", None);
        assert!(!admin.is_enabled());
        assert_eq!(
            admin.verify("admin@example.com", "anything"),
            Err(AuthError::Disabled)
        );
    }

    #[test]
    fn test_extract_token_prefers_session_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-bearer".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("from-bearer"));

        headers.insert(SESSION_HEADER, "from-header".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_extract_token_ignores_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_token(&headers), None);
    }
}
