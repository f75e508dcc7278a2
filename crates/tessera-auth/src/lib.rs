//! # tessera-auth
//!
//! Cookie-based session authentication backed by rotating refresh tokens.
//!
//! This crate provides:
//! - Short-lived HMAC-signed access tokens
//! - Persisted, hashed refresh tokens that rotate on every use
//! - Replay detection with account lockout
//! - Google sign-in
//! - Axum middleware and handlers for the cookie transport
//!
//! ## Overview
//!
//! Every authenticated request goes through
//! [`TokenService::authenticate`](token::TokenService::authenticate): the
//! access token is verified, and if it has expired the refresh token is
//! exchanged for a new pair exactly once. Presenting a refresh token that was
//! already rotated or revoked is treated as theft; see [`token::reuse`].
//!
//! ## Modules
//!
//! - [`config`] - Token engine configuration
//! - [`token`] - Token issuance, verification, rotation and revocation
//! - [`storage`] - Storage traits and the in-memory adapter
//! - [`federation`] - External identity provider integration
//! - [`middleware`] - Session middleware and error responses
//! - [`http`] - Axum handlers for the `/auth` routes
//! - [`audit`] - Security event audit logging
//! - [`types`] - Domain types

pub mod audit;
pub mod config;
pub mod error;
pub mod federation;
pub mod http;
pub mod middleware;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, TokenSettings};
pub use error::{AuthError, ErrorCategory};
pub use federation::{GoogleConfig, GoogleIdentityProvider, IdentityProvider, IdpError};
pub use middleware::{AuthState, CurrentUser, require_session};
pub use storage::{CredentialStore, InMemoryCredentialStore, RevokeOutcome, UserDirectory};
pub use token::{AuthOutcome, IssuedTokens, Rotation, SignIn, TokenService};
pub use types::{IdentityProfile, RefreshToken, RevocationReason, UpdateProfile, User};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tessera_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, TokenSettings};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::federation::{IdentityProvider, IdpError};
    pub use crate::middleware::{AuthState, CurrentUser, require_session};
    pub use crate::storage::{CredentialStore, RevokeOutcome, UserDirectory};
    pub use crate::token::{AuthOutcome, IssuedTokens, TokenService};
    pub use crate::types::{IdentityProfile, RefreshToken, RevocationReason, UpdateProfile, User};
}
