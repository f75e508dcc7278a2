//! Token engine configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! access_token_lifetime = "15m"
//! refresh_token_lifetime = "7d"
//! reuse_threshold = 5
//!
//! [auth.signing]
//! secret = "..."
//! algorithm = "HS256"
//!
//! [auth.cookies]
//! secure = true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::token::duration::{Lifetime, MAX_LIFETIME};
use crate::token::jwt::SigningAlgorithm;

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Root token engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token signing configuration.
    pub signing: SigningConfig,

    /// Access token lifetime in the compact form, e.g. `"15m"`.
    pub access_token_lifetime: String,

    /// Refresh token lifetime in the compact form, e.g. `"7d"`.
    pub refresh_token_lifetime: String,

    /// Replays of one revoked refresh token after which the owner is blocked.
    pub reuse_threshold: u32,

    /// Cookie transport configuration.
    pub cookies: CookieConfig,

    /// Audit logging configuration.
    pub audit: AuditConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing: SigningConfig::default(),
            access_token_lifetime: "15m".to_string(),
            refresh_token_lifetime: "7d".to_string(),
            reuse_threshold: 5,
            cookies: CookieConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// Access token signing configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared HMAC secret.
    pub secret: String,

    /// HMAC algorithm: `HS256`, `HS384` or `HS512`.
    pub algorithm: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: "HS256".to_string(),
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Cookie transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Name of the access token cookie.
    pub access_token_name: String,

    /// Name of the refresh token cookie.
    pub refresh_token_name: String,

    /// Set the `Secure` attribute. Should be on in production.
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_token_name: "access-token".to_string(),
            refresh_token_name: "refresh-token".to_string(),
            secure: true,
        }
    }
}

/// Audit logging configuration.
///
/// Controls which security events are written to the `tessera::audit` target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Log refresh token reuse and account blocking.
    pub log_security_events: bool,

    /// Log token operations (issue, rotate, revoke).
    pub log_token_operations: bool,

    /// Log failed authentication attempts.
    pub log_failed_auth: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_security_events: true,
            log_token_operations: true,
            log_failed_auth: true,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::configuration(err.to_string())
    }
}

/// Validated, parsed settings consumed by the token engine.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,
    /// Access token lifetime.
    pub access_lifetime: Lifetime,
    /// Refresh token lifetime.
    pub refresh_lifetime: Lifetime,
    /// Reuse threshold, at least 1.
    pub reuse_threshold: u32,
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the signing secret is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The secret is shorter than [`MIN_SECRET_LEN`] bytes
    /// - The signing algorithm is not supported
    /// - A lifetime does not parse, is zero or exceeds [`MAX_LIFETIME`]
    /// - The access lifetime is not shorter than the refresh lifetime
    /// - The reuse threshold is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings().map(|_| ())
    }

    /// Validates the configuration and returns the parsed settings.
    ///
    /// # Errors
    ///
    /// See [`AuthConfig::validate`].
    pub fn settings(&self) -> Result<TokenSettings, ConfigError> {
        if self.signing.secret.is_empty() {
            return Err(ConfigError::Missing("auth.signing.secret".to_string()));
        }
        if self.signing.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "auth.signing.secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let algorithm: SigningAlgorithm = self
            .signing
            .algorithm
            .parse()
            .map_err(|e: AuthError| ConfigError::InvalidValue(e.to_string()))?;

        let access_lifetime = parse_nonzero("auth.access_token_lifetime", &self.access_token_lifetime)?;
        let refresh_lifetime =
            parse_nonzero("auth.refresh_token_lifetime", &self.refresh_token_lifetime)?;

        if access_lifetime.duration() >= refresh_lifetime.duration() {
            return Err(ConfigError::InvalidValue(format!(
                "access_token_lifetime ({access_lifetime}) must be shorter than refresh_token_lifetime ({refresh_lifetime})"
            )));
        }

        if self.reuse_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "reuse_threshold must be > 0".to_string(),
            ));
        }

        if self.cookies.access_token_name.is_empty() || self.cookies.refresh_token_name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "cookie names cannot be empty".to_string(),
            ));
        }
        if self.cookies.access_token_name == self.cookies.refresh_token_name {
            return Err(ConfigError::InvalidValue(
                "access and refresh cookie names must differ".to_string(),
            ));
        }

        Ok(TokenSettings {
            algorithm,
            access_lifetime,
            refresh_lifetime,
            reuse_threshold: self.reuse_threshold,
        })
    }
}

fn parse_nonzero(key: &str, value: &str) -> Result<Lifetime, ConfigError> {
    let lifetime: Lifetime = value
        .parse()
        .map_err(|e: AuthError| ConfigError::InvalidValue(format!("{key}: {e}")))?;
    if lifetime.whole_seconds() == 0 {
        return Err(ConfigError::InvalidValue(format!("{key} must be > 0")));
    }
    if lifetime.duration() > MAX_LIFETIME {
        return Err(ConfigError::InvalidValue(format!(
            "{key} must not exceed {} days",
            MAX_LIFETIME.whole_days()
        )));
    }
    Ok(lifetime)
}
