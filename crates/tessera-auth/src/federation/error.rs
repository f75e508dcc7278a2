//! Error types for identity provider exchanges.

use crate::error::AuthError;

/// Errors that can occur while exchanging an authorization code.
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    /// Token exchange with the IdP failed.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Fetching the user profile failed.
    #[error("Userinfo request failed: {0}")]
    UserinfoFailed(String),

    /// The IdP returned an OAuth error.
    #[error("OAuth error from IdP: {error} - {description}")]
    OAuthError {
        /// The OAuth error code.
        error: String,
        /// Optional error description.
        description: String,
    },

    /// A required field is missing from the IdP response.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A network error occurred.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Failed to parse a URL.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl IdpError {
    /// Creates an `OAuthError` from IdP response.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuthError {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns `true` if the IdP rejected the request, as opposed to being
    /// unreachable.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::OAuthError { .. } | Self::TokenExchangeFailed(_) | Self::MissingField(_)
        )
    }

    /// Converts into an [`AuthError::IdentityProvider`] for `provider`.
    #[must_use]
    pub fn into_auth_error(self, provider: &str) -> AuthError {
        AuthError::identity_provider(provider, self.to_string())
    }
}
