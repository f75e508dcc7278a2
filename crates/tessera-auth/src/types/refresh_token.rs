//! Refresh token domain type.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Records are revoked, never deleted, so a replayed value is recognised
//! - Every revocation carries a reason

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::duration::expiry_after;

/// Why a refresh token was revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevocationReason {
    /// Replaced by a new pair during rotation.
    Rotated,
    /// Presented after its expiry.
    Expired,
    /// Revoked by an explicit sign-out.
    Logout,
    /// Revoked because a replay of a revoked token was detected.
    ReuseDetected,
}

impl RevocationReason {
    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rotated => "rotated",
            Self::Expired => "expired",
            Self::Logout => "logout",
            Self::ReuseDetected => "reuse-detected",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevocationReason {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rotated" => Ok(Self::Rotated),
            "expired" => Ok(Self::Expired),
            "logout" => Ok(Self::Logout),
            "reuse-detected" => Ok(Self::ReuseDetected),
            other => Err(AuthError::storage(format!(
                "Unknown revocation reason: '{other}'"
            ))),
        }
    }
}

/// Refresh token stored in the credential store.
///
/// The token itself is never stored. When validating a refresh token:
///
/// 1. Hash the incoming token
/// 2. Look up by hash
/// 3. Check revocation (a revoked hit is a replay), then expiration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// SHA-256 hash of the token value.
    pub token_hash: String,

    /// Owning user.
    pub user_id: Uuid,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Whether this token has been revoked.
    pub is_revoked: bool,

    /// When this token was revoked.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Why this token was revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_reason: Option<RevocationReason>,

    /// How many times this token was presented after revocation.
    pub reused_count: u32,
}

impl RefreshToken {
    /// Creates a fresh, unrevoked record for `token_hash` valid for `lifetime`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDurationFormat` if the expiry is out of range.
    pub fn new(token_hash: String, user_id: Uuid, lifetime: Duration) -> AuthResult<Self> {
        let now = OffsetDateTime::now_utc();
        Ok(Self {
            id: Uuid::new_v4(),
            token_hash,
            user_id,
            created_at: now,
            expires_at: expiry_after(now, lifetime)?,
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            reused_count: 0,
        })
    }

    /// Returns `true` if this token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if this token is valid (not expired and not revoked).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked
    }

    /// Marks the record revoked. Returns `false` if it already was.
    pub fn revoke(&mut self, reason: RevocationReason, at: OffsetDateTime) -> bool {
        if self.is_revoked {
            return false;
        }
        self.is_revoked = true;
        self.revoked_at = Some(at);
        self.revoked_reason = Some(reason);
        true
    }

    /// Hash a token value using SHA-256.
    ///
    /// This is used both when storing new tokens and when looking up
    /// tokens for validation.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a cryptographically secure random token.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lifetime: Duration) -> RefreshToken {
        RefreshToken::new(
            RefreshToken::hash_token("value"),
            Uuid::new_v4(),
            lifetime,
        ).unwrap()
    }

    #[test]
    fn test_hash_token() {
        let hash = RefreshToken::hash_token("test-token-value");

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, RefreshToken::hash_token("test-token-value"));
        assert_ne!(hash, RefreshToken::hash_token("different-token"));
    }

    #[test]
    fn test_generate_token() {
        let token = RefreshToken::generate_token();

        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let mut tokens: Vec<String> = (0..100).map(|_| RefreshToken::generate_token()).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_new_record_is_active() {
        let token = record(Duration::days(7));
        assert!(!token.is_revoked);
        assert_eq!(token.reused_count, 0);
        assert!(token.revoked_at.is_none());
        assert!(token.is_valid());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let result = RefreshToken::new(
            RefreshToken::hash_token("value"),
            Uuid::new_v4(),
            Duration::days(999_999_999),
        );
        assert!(matches!(result, Err(AuthError::InvalidDurationFormat { .. })));
    }

    #[test]
    fn test_expiry_boundary() {
        let token = record(Duration::hours(1));
        assert!(!token.is_expired_at(token.expires_at));
        assert!(token.is_expired_at(token.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_revoke_is_compare_and_set() {
        let mut token = record(Duration::days(1));
        let at = OffsetDateTime::now_utc();

        assert!(token.revoke(RevocationReason::Rotated, at));
        assert!(!token.revoke(RevocationReason::Logout, at));
        assert_eq!(token.revoked_reason, Some(RevocationReason::Rotated));
        assert!(!token.is_valid());
    }

    #[test]
    fn test_reason_strings() {
        for reason in [
            RevocationReason::Rotated,
            RevocationReason::Expired,
            RevocationReason::Logout,
            RevocationReason::ReuseDetected,
        ] {
            assert_eq!(reason.as_str().parse::<RevocationReason>().unwrap(), reason);
        }
        assert_eq!(
            serde_json::to_string(&RevocationReason::ReuseDetected).unwrap(),
            "\"reuse-detected\""
        );
        assert!("stolen".parse::<RevocationReason>().is_err());
    }
}
