//! Access token signing and verification.
//!
//! Access tokens are compact HMAC-signed JWTs carrying the user id (`sub`),
//! the user's email, issue and expiry timestamps and a random `jti`.
//!
//! ## Example
//!
//! ```ignore
//! use tessera_auth::token::jwt::{JwtService, SigningAlgorithm};
//!
//! let jwt = JwtService::new(secret.as_bytes(), SigningAlgorithm::HS256);
//! let token = jwt.sign(&user_id.to_string(), "ada@example.com", "15m")?;
//! let claims = jwt.verify(&token)?;
//! ```

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::duration::{expiry_after, parse_lifetime};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// The token could not be parsed or is missing required claims.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::ExpiredCredential,
            JwtError::InvalidSignature => AuthError::InvalidSignature,
            JwtError::Malformed { message } => AuthError::MalformedCredential { message },
            JwtError::EncodingError { message } => {
                AuthError::internal(format!("Failed to encode access token: {message}"))
            }
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported HMAC signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(AuthError::configuration(format!(
                "Invalid signing algorithm: '{other}'. Must be HS256, HS384, or HS512"
            ))),
        }
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    /// Subject (user id).
    pub sub: String,

    /// User email at the time of issuance.
    pub email: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// JWT ID. Makes two tokens issued in the same second distinct.
    pub jti: String,
}

impl AccessTokenClaims {
    /// Creates claims valid from now for the given lifetime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDurationFormat` if the expiry is out of range.
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        lifetime: Duration,
    ) -> AuthResult<Self> {
        let now = OffsetDateTime::now_utc();
        Ok(Self {
            sub: subject.into(),
            email: email.into(),
            iat: now.unix_timestamp(),
            exp: expiry_after(now, lifetime)?.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
        })
    }

    /// Returns the expiry as an `OffsetDateTime`.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Parses the subject as a user id.
    ///
    /// # Errors
    ///
    /// Returns `MalformedCredential` if the subject is not a UUID.
    pub fn user_id(&self) -> AuthResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AuthError::malformed("Token subject is not a valid user id"))
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for signing and verifying access tokens.
///
/// This service is `Send + Sync` and is shared behind an `Arc`.
pub struct JwtService {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Creates a new JWT service from a shared secret.
    #[must_use]
    pub fn new(secret: &[u8], algorithm: SigningAlgorithm) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Returns the configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Encodes claims into a JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &AccessTokenClaims) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm.to_jwt_algorithm());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a JWT string.
    ///
    /// The signature is checked before expiry, so a forged token is always
    /// reported as `InvalidSignature` even when it is also expired.
    ///
    /// # Errors
    /// Returns an error if decoding or validation fails.
    pub fn decode(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Signs an access token for `subject` expiring `lifetime` from now.
    ///
    /// Returns the token together with the claims it carries.
    ///
    /// # Errors
    /// Returns `InvalidDurationFormat` if the expiry is out of range and
    /// `Internal` if encoding fails.
    pub fn sign_for(
        &self,
        subject: &str,
        email: &str,
        lifetime: Duration,
    ) -> AuthResult<(String, AccessTokenClaims)> {
        let claims = AccessTokenClaims::new(subject, email, lifetime)?;
        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    /// Signs an access token using a compact lifetime such as `"15m"`.
    ///
    /// # Errors
    /// Returns `InvalidDurationFormat` if `ttl` does not parse or puts the
    /// expiry out of range.
    pub fn sign(&self, subject: &str, email: &str, ttl: &str) -> AuthResult<String> {
        let lifetime = parse_lifetime(ttl)?;
        self.sign_for(subject, email, lifetime)
            .map(|(token, _)| token)
            .map_err(|e| match e {
                AuthError::InvalidDurationFormat { .. } => AuthError::invalid_duration(ttl),
                other => other,
            })
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    /// Returns `ExpiredCredential`, `InvalidSignature` or `MalformedCredential`.
    pub fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        Ok(self.decode(token)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hmac";

    fn service() -> JwtService {
        JwtService::new(SECRET, SigningAlgorithm::HS256)
    }

    fn claims_expiring_at(exp: i64) -> AccessTokenClaims {
        AccessTokenClaims {
            sub: Uuid::new_v4().to_string(),
            email: "ada@example.com".to_string(),
            iat: exp - 900,
            exp,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let service = service();
        let subject = Uuid::new_v4().to_string();

        let token = service.sign(&subject, "ada@example.com", "15m").unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, subject);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_each_algorithm_roundtrips() {
        for algorithm in [
            SigningAlgorithm::HS256,
            SigningAlgorithm::HS384,
            SigningAlgorithm::HS512,
        ] {
            let service = JwtService::new(SECRET, algorithm);
            let token = service.sign("subject", "a@b.c", "1h").unwrap();
            assert_eq!(service.verify(&token).unwrap().sub, "subject");
        }
    }

    #[test]
    fn test_sign_rejects_invalid_ttl() {
        let err = service().sign("subject", "a@b.c", "15 minutes").unwrap_err();
        assert!(matches!(err, AuthError::InvalidDurationFormat { .. }));
    }

    #[test]
    fn test_sign_rejects_out_of_range_ttl() {
        let err = service().sign("subject", "a@b.c", "999999999d").unwrap_err();
        match err {
            AuthError::InvalidDurationFormat { value } => assert_eq!(value, "999999999d"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = service()
            .sign_for("subject", "a@b.c", Duration::MAX)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidDurationFormat { .. }));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = service();
        let exp = OffsetDateTime::now_utc().unix_timestamp() - 10;
        let token = service.encode(&claims_expiring_at(exp)).unwrap();

        let err = service.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::ExpiredCredential));
    }

    #[test]
    fn test_unexpired_token_accepted() {
        let service = service();
        let exp = OffsetDateTime::now_utc().unix_timestamp() + 10;
        let token = service.encode(&claims_expiring_at(exp)).unwrap();

        assert!(service.verify(&token).is_ok());
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let signer = JwtService::new(b"first-secret-first-secret-first-secret", SigningAlgorithm::HS256);
        let verifier = service();

        let token = signer.sign("subject", "a@b.c", "15m").unwrap();
        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_forged_expired_token_reports_signature() {
        let signer = JwtService::new(b"first-secret-first-secret-first-secret", SigningAlgorithm::HS256);
        let exp = OffsetDateTime::now_utc().unix_timestamp() - 10;
        let token = signer.encode(&claims_expiring_at(exp)).unwrap();

        let err = service().verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = service();
        let token = service.sign("subject", "a@b.c", "15m").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(
            br#"{"sub":"attacker","email":"a@b.c","iat":0,"exp":99999999999,"jti":"x"}"#,
        );
        parts[1] = &forged;
        let tampered = parts.join(".");

        let err = service.verify(&tampered).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let service = service();
        for input in ["", "not-a-jwt", "a.b", "a.b.c", "a.b.c.d"] {
            let err = service.verify(input).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedCredential { .. }),
                "input {input:?} should be malformed, got {err:?}"
            );
        }
    }

    #[test]
    fn test_algorithm_mismatch_is_malformed() {
        let signer = JwtService::new(SECRET, SigningAlgorithm::HS512);
        let token = signer.sign("subject", "a@b.c", "15m").unwrap();

        let err = service().verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::MalformedCredential { .. }));
    }

    #[test]
    fn test_claims_user_id() {
        let id = Uuid::new_v4();
        let claims = AccessTokenClaims::new(id.to_string(), "a@b.c", Duration::minutes(1)).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);

        let claims = AccessTokenClaims::new("not-a-uuid", "a@b.c", Duration::minutes(1)).unwrap();
        assert!(matches!(
            claims.user_id().unwrap_err(),
            AuthError::MalformedCredential { .. }
        ));
    }

    #[test]
    fn test_jti_is_unique() {
        let a = AccessTokenClaims::new("s", "e", Duration::minutes(1)).unwrap();
        let b = AccessTokenClaims::new("s", "e", Duration::minutes(1)).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_signing_algorithm_parse() {
        assert_eq!("HS384".parse::<SigningAlgorithm>().unwrap(), SigningAlgorithm::HS384);
        assert!("RS256".parse::<SigningAlgorithm>().is_err());
        assert_eq!(SigningAlgorithm::default().as_str(), "HS256");
    }
}
