//! Token lifecycle.
//!
//! - [`jwt`] - access token signing and verification
//! - [`duration`] - the compact lifetime grammar (`15m`, `7d`)
//! - [`issuer`] - new access/refresh pairs
//! - [`verifier`] - per-request access token checks
//! - [`rotation`] - refresh token rotation
//! - [`reuse`] - replay detection and lockout
//! - [`service`] - the facade used by the HTTP layer

pub mod duration;
pub mod issuer;
pub mod jwt;
pub mod reuse;
pub mod rotation;
pub mod service;
pub mod verifier;

pub use duration::{Lifetime, MAX_LIFETIME, expiry_after, parse_lifetime};
pub use issuer::{IssuedTokens, TokenIssuer};
pub use jwt::{AccessTokenClaims, JwtError, JwtService, SigningAlgorithm};
pub use reuse::{ReuseGuard, ReuseVerdict};
pub use rotation::{Rotation, RotationEngine};
pub use service::{AuthOutcome, SignIn, TokenService};
pub use verifier::AccessVerifier;
