//! External identity provider federation.
//!
//! An [`IdentityProvider`] turns an authorization code obtained by the
//! browser into an [`IdentityProfile`]. The token engine never talks to the
//! provider directly; the login handler does, then calls
//! [`TokenService::login`](crate::token::TokenService::login).

pub mod error;
pub mod google;

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::IdentityProfile;

pub use error::IdpError;
pub use google::{GoogleConfig, GoogleIdentityProvider};

/// Exchanges authorization codes for user profiles.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name used in errors and logs.
    fn name(&self) -> &str;

    /// Exchanges `code` for the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `IdentityProvider` if the provider rejects the code or cannot
    /// be reached.
    async fn exchange_code(&self, code: &str) -> AuthResult<IdentityProfile>;
}
