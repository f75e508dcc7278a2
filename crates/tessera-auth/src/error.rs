//! Authentication error types.
//!
//! Every failure the token engine can produce is a distinct variant so that
//! callers can tell routine session aging (an expired access token) apart from
//! security events (a replayed refresh token, a blocked account).

use std::fmt;

/// Errors that can occur while issuing, verifying, rotating or revoking credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential is not a structurally valid signed token.
    #[error("Malformed credential: {message}")]
    MalformedCredential {
        /// Description of what could not be parsed.
        message: String,
    },

    /// The credential signature does not match the server secret.
    #[error("Invalid credential signature")]
    InvalidSignature,

    /// The access credential has expired. This is the only failure that
    /// triggers a rotation attempt.
    #[error("Credential expired")]
    ExpiredCredential,

    /// No access credential was supplied.
    #[error("Missing access credential")]
    MissingCredential,

    /// No refresh credential was supplied for rotation.
    #[error("Missing refresh credential")]
    NoRefreshCredential,

    /// The refresh credential was never issued by this server.
    #[error("Unknown refresh token")]
    UnknownRefreshToken,

    /// The refresh credential is past its expiry.
    #[error("Refresh token expired")]
    RefreshTokenExpired,

    /// A revoked refresh credential was presented again.
    #[error("Refresh token reuse detected")]
    RefreshTokenReused,

    /// The account has been blocked.
    #[error("Account is blocked")]
    AccountBlocked,

    /// The user referenced by a credential does not exist.
    #[error("User not found")]
    UserNotFound,

    /// A lifetime string does not follow the `<integer><s|m|h|d>` grammar.
    #[error("Invalid duration format: '{value}'")]
    InvalidDurationFormat {
        /// The rejected input.
        value: String,
    },

    /// A request body failed validation.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the rejected input.
        message: String,
    },

    /// An error occurred while storing or retrieving credential data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// The identity provider rejected the exchange or was unreachable.
    #[error("Identity provider error: {provider} - {message}")]
    IdentityProvider {
        /// The identity provider name.
        provider: String,
        /// Description of the error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `MalformedCredential` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCredential {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidDurationFormat` error.
    #[must_use]
    pub fn invalid_duration(value: impl Into<String>) -> Self {
        Self::InvalidDurationFormat {
            value: value.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a new `IdentityProvider` error.
    #[must_use]
    pub fn identity_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IdentityProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the caller should attempt exactly one rotation.
    #[must_use]
    pub fn triggers_rotation(&self) -> bool {
        matches!(self, Self::ExpiredCredential)
    }

    /// Returns `true` if this error indicates an attack or a locked account
    /// rather than ordinary session aging.
    #[must_use]
    pub fn is_security_event(&self) -> bool {
        matches!(self, Self::RefreshTokenReused | Self::AccountBlocked)
    }

    /// Returns `true` if this error should be answered with 401.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedCredential { .. }
                | Self::InvalidSignature
                | Self::ExpiredCredential
                | Self::MissingCredential
                | Self::NoRefreshCredential
                | Self::UnknownRefreshToken
                | Self::RefreshTokenExpired
                | Self::RefreshTokenReused
                | Self::AccountBlocked
                | Self::UserNotFound
        )
    }

    /// Returns `true` if this is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::InvalidDurationFormat { .. }
                | Self::Internal { .. }
                | Self::IdentityProvider { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedCredential { .. } => ErrorCategory::Credential,
            Self::InvalidSignature => ErrorCategory::Credential,
            Self::ExpiredCredential => ErrorCategory::Credential,
            Self::MissingCredential => ErrorCategory::Credential,
            Self::NoRefreshCredential => ErrorCategory::Session,
            Self::UnknownRefreshToken => ErrorCategory::Session,
            Self::RefreshTokenExpired => ErrorCategory::Session,
            Self::UserNotFound => ErrorCategory::Session,
            Self::RefreshTokenReused => ErrorCategory::SecurityEvent,
            Self::AccountBlocked => ErrorCategory::SecurityEvent,
            Self::InvalidDurationFormat { .. } => ErrorCategory::Configuration,
            Self::InvalidRequest { .. } => ErrorCategory::Request,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
            Self::IdentityProvider { .. } => ErrorCategory::Federation,
        }
    }

    /// Returns a stable machine-readable code for response bodies and logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedCredential { .. } => "malformed_credential",
            Self::InvalidSignature => "invalid_signature",
            Self::ExpiredCredential => "expired_credential",
            Self::MissingCredential => "missing_credential",
            Self::NoRefreshCredential => "no_refresh_credential",
            Self::UnknownRefreshToken => "unknown_refresh_token",
            Self::RefreshTokenExpired => "refresh_token_expired",
            Self::RefreshTokenReused => "refresh_token_reused",
            Self::AccountBlocked => "account_blocked",
            Self::UserNotFound => "user_not_found",
            Self::InvalidDurationFormat { .. } => "invalid_duration_format",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Storage { .. } => "storage_error",
            Self::Configuration { .. } => "configuration_error",
            Self::Internal { .. } => "internal_error",
            Self::IdentityProvider { .. } => "identity_provider_error",
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Access credential problems (missing, malformed, expired, forged).
    Credential,
    /// Refresh credential problems that are part of normal session aging.
    Session,
    /// Replay of a revoked refresh token or a locked account.
    SecurityEvent,
    /// Rejected request input.
    Request,
    /// Configuration errors.
    Configuration,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
    /// Identity provider federation errors.
    Federation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "credential"),
            Self::Session => write!(f, "session"),
            Self::SecurityEvent => write!(f, "security_event"),
            Self::Request => write!(f, "request"),
            Self::Configuration => write!(f, "configuration"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
            Self::Federation => write!(f, "federation"),
        }
    }
}
