//! Refresh token storage.
//!
//! Tokens are looked up by their SHA-256 hash. Revocation and reuse counting
//! are conditional single-statement updates.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tessera_auth::{RefreshToken, RevocationReason, RevokeOutcome};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{PgPool, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

type RefreshTokenTuple = (
    Uuid,
    String,
    Uuid,
    OffsetDateTime,
    OffsetDateTime,
    bool,
    Option<OffsetDateTime>,
    Option<String>,
    i32,
);

const TOKEN_COLUMNS: &str = "id, token_hash, user_id, created_at, expires_at, \
     is_revoked, revoked_at, revoked_reason, reused_count";

/// Refresh token record from database.
#[derive(Debug, Clone)]
pub struct RefreshTokenRow {
    pub id: Uuid,
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub is_revoked: bool,
    pub revoked_at: Option<OffsetDateTime>,
    pub revoked_reason: Option<String>,
    pub reused_count: i32,
}

impl RefreshTokenRow {
    /// Create from database tuple.
    fn from_tuple(row: RefreshTokenTuple) -> Self {
        Self {
            id: row.0,
            token_hash: row.1,
            user_id: row.2,
            created_at: row.3,
            expires_at: row.4,
            is_revoked: row.5,
            revoked_at: row.6,
            revoked_reason: row.7,
            reused_count: row.8,
        }
    }

    /// Convert to the domain record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` for an unknown revocation reason or a negative
    /// reuse count.
    pub fn into_domain(self) -> StorageResult<RefreshToken> {
        let revoked_reason = self
            .revoked_reason
            .as_deref()
            .map(str::parse::<RevocationReason>)
            .transpose()
            .map_err(|e| StorageError::invalid_data(e.to_string()))?;
        let reused_count = u32::try_from(self.reused_count).map_err(|_| {
            StorageError::invalid_data(format!("negative reused_count {}", self.reused_count))
        })?;

        Ok(RefreshToken {
            id: self.id,
            token_hash: self.token_hash,
            user_id: self.user_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            is_revoked: self.is_revoked,
            revoked_at: self.revoked_at,
            revoked_reason,
            reused_count,
        })
    }
}

fn count_to_db(count: u32) -> StorageResult<i32> {
    i32::try_from(count)
        .map_err(|_| StorageError::invalid_data(format!("reused_count {count} out of range")))
}

// =============================================================================
// Token Storage
// =============================================================================

/// Refresh token storage operations.
pub struct TokenStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenStorage<'a> {
    /// Create a new token storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a token by its hash, regardless of revocation or expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_hash(&self, token_hash: &str) -> StorageResult<Option<RefreshToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token_hash = $1");
        let row: Option<RefreshTokenTuple> = query_as(&sql)
            .bind(token_hash)
            .fetch_optional(self.pool)
            .await?;

        row.map(RefreshTokenRow::from_tuple)
            .map(RefreshTokenRow::into_domain)
            .transpose()
    }

    /// Insert a new token record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the hash already exists.
    pub async fn create(&self, token: &RefreshToken) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO refresh_tokens
                (id, token_hash, user_id, created_at, expires_at,
                 is_revoked, revoked_at, revoked_reason, reused_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.is_revoked)
        .bind(token.revoked_at)
        .bind(token.revoked_reason.map(|r| r.as_str()))
        .bind(count_to_db(token.reused_count)?)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::conflict("Refresh token hash already exists");
            }
            StorageError::from(e)
        })?;

        Ok(())
    }

    /// Persist the mutable fields of an existing record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record has this hash.
    pub async fn save(&self, token: &RefreshToken) -> StorageResult<()> {
        let result = query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = $2, revoked_at = $3, revoked_reason = $4, reused_count = $5
            WHERE token_hash = $1
            "#,
        )
        .bind(&token.token_hash)
        .bind(token.is_revoked)
        .bind(token.revoked_at)
        .bind(token.revoked_reason.map(|r| r.as_str()))
        .bind(count_to_db(token.reused_count)?)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Refresh token"));
        }
        Ok(())
    }

    /// Revoke a token if it is still active.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn revoke(
        &self,
        token_hash: &str,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> StorageResult<RevokeOutcome> {
        let revoked: Option<(Uuid,)> = query_as(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $3, revoked_reason = $2
            WHERE token_hash = $1 AND NOT is_revoked
            RETURNING id
            "#,
        )
        .bind(token_hash)
        .bind(reason.as_str())
        .bind(at)
        .fetch_optional(self.pool)
        .await?;

        if revoked.is_some() {
            return Ok(RevokeOutcome::Revoked);
        }

        let exists: Option<(Uuid,)> = query_as("SELECT id FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(self.pool)
            .await?;

        Ok(match exists {
            Some(_) => RevokeOutcome::AlreadyRevoked,
            None => RevokeOutcome::NotFound,
        })
    }

    /// Increment the reuse counter and return the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn increment_reuse_count(&self, token_hash: &str) -> StorageResult<Option<u32>> {
        let row: Option<(i32,)> = query_as(
            r#"
            UPDATE refresh_tokens
            SET reused_count = reused_count + 1
            WHERE token_hash = $1
            RETURNING reused_count
            "#,
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(|(count,)| {
            u32::try_from(count)
                .map_err(|_| StorageError::invalid_data(format!("negative reused_count {count}")))
        })
        .transpose()
    }

    /// Revoke every active token of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> StorageResult<u64> {
        let result = query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $3, revoked_reason = $2
            WHERE user_id = $1 AND NOT is_revoked
            "#,
        )
        .bind(user_id)
        .bind(reason.as_str())
        .bind(at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
