//! Error response handling for authentication middleware.
//!
//! Credential, session and security failures become `401` with a
//! `WWW-Authenticate` header, rejected input `400`, identity provider
//! failures `502`, and everything else `500`. The body is always `{"error": code, "message": ...}`.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = error_details(&self);

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let body = json!({
            "error": self.code(),
            "message": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(self.code(), &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Returns the HTTP status for an error.
#[must_use]
pub fn status_for(error: &AuthError) -> StatusCode {
    error_details(error).0
}

/// Returns (HTTP status, client-facing message).
///
/// Server-side messages are replaced with a generic one.
fn error_details(error: &AuthError) -> (StatusCode, String) {
    match error {
        AuthError::IdentityProvider { provider, .. } => (
            StatusCode::BAD_GATEWAY,
            format!("Identity provider '{provider}' is unavailable"),
        ),
        AuthError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, error.to_string()),
        e if e.is_client_error() => (StatusCode::UNAUTHORIZED, e.to_string()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

/// Format: `Bearer realm="tessera", error="...", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('"', "\\\"");
    format!("Bearer realm=\"tessera\", error=\"{error}\", error_description=\"{escaped_desc}\"")
}
