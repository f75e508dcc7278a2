//! Domain types shared by the token engine, the storage adapters and the
//! HTTP layer.
//!
//! - [`User`] - an authenticated end user
//! - [`IdentityProfile`] - what an identity provider tells us about a user
//! - [`UpdateProfile`] - self-service profile changes
//! - [`RefreshToken`] - persisted, rotating refresh credential
//! - [`RevocationReason`] - why a refresh credential stopped being usable

pub mod refresh_token;
pub mod user;

pub use refresh_token::{RefreshToken, RevocationReason};
pub use user::{IdentityProfile, UpdateProfile, User};
