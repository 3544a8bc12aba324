use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Flat JSON error body: `{"error": "..."}`.
///
/// The web app's fetch wrappers read `error` off the top level, so this
/// stays a single field rather than a nested error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    /// SSO bridging is switched off in configuration
    SsoDisabled,

    /// No bridge session cookie, or the referenced session is gone/expired
    SessionNotFound,

    /// Internal error during sign-in or session handling
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::SsoDisabled => (StatusCode::NOT_FOUND, "Sparka SSO is not enabled"),
            AuthError::SessionNotFound => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            AuthError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::SsoDisabled => write!(f, "Sparka SSO is not enabled"),
            AuthError::SessionNotFound => write!(f, "Session not found"),
            AuthError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sso_disabled_is_404() {
        let response = AuthError::SsoDisabled.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_session_not_found_is_401() {
        let response = AuthError::SessionNotFound.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_is_500() {
        let response = AuthError::Internal("session store failure".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorResponse::new("Sparka SSO is not enabled"))
            .expect("serializes");
        assert_eq!(
            body,
            serde_json::json!({"error": "Sparka SSO is not enabled"})
        );
    }
}
