//! Credential storage trait.
//!
//! # Security Considerations
//!
//! - Refresh tokens are stored as SHA-256 hashes only
//! - Revocation and reuse counting must be single atomic operations
//! - Records are never deleted; a revoked record is what makes replay detectable

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{RefreshToken, RevocationReason, User};

/// Result of a compare-and-set revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The record was active and is now revoked.
    Revoked,
    /// The record was already revoked; nothing changed.
    AlreadyRevoked,
    /// No record has this hash.
    NotFound,
}

impl RevokeOutcome {
    /// Returns `true` if this call performed the revocation.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

/// Storage for refresh-token records and the user state needed to authorize
/// a request.
///
/// # Implementations
///
/// - [`InMemoryCredentialStore`](crate::storage::InMemoryCredentialStore)
/// - `tessera-auth-postgres` - PostgreSQL storage backend
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_user_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>>;

    /// Finds a refresh token by its hash.
    ///
    /// Returns tokens regardless of expiration/revocation status.
    ///
    /// # Arguments
    ///
    /// * `token_hash` - SHA-256 hash from [`RefreshToken::hash_token`]
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_refresh_token(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Stores a new refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash already exists or the store is unavailable.
    async fn create_refresh_token(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Persists the mutable fields of an existing record: `is_revoked`,
    /// `revoked_at`, `revoked_reason` and `reused_count`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or the operation fails.
    async fn save_refresh_token(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Marks a user as blocked.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    async fn mark_user_blocked(&self, user_id: Uuid) -> AuthResult<()>;

    /// Revokes a refresh token if it is still active.
    ///
    /// This is a compare-and-set on `is_revoked`: of several concurrent
    /// callers exactly one observes [`RevokeOutcome::Revoked`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> AuthResult<RevokeOutcome>;

    /// Atomically increments `reused_count`.
    ///
    /// # Returns
    ///
    /// The post-increment value, or `None` if no record has this hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn increment_reuse_count(&self, token_hash: &str) -> AuthResult<Option<u32>>;

    /// Revokes every still-active refresh token of a user.
    ///
    /// # Returns
    ///
    /// The number of records revoked by this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_user_refresh_tokens(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> AuthResult<u64>;
}
