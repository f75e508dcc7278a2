//! User storage.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tessera_auth::{IdentityProfile, UpdateProfile, User};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{PgPool, StorageError, StorageResult};

type UserTuple = (
    Uuid,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    OffsetDateTime,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

const USER_COLUMNS: &str = "id, email, first_name, last_name, picture_url, provider_id, \
     is_blocked, created_at, updated_at, last_login_at";

/// User record from database.
#[derive(Debug, Clone)]
pub struct UserRow(UserTuple);

impl UserRow {
    /// Convert to the domain user.
    #[must_use]
    pub fn into_domain(self) -> User {
        let row = self.0;
        User {
            id: row.0,
            email: row.1,
            first_name: row.2,
            last_name: row.3,
            picture_url: row.4,
            provider_id: row.5,
            is_blocked: row.6,
            created_at: row.7,
            updated_at: row.8,
            last_login_at: row.9,
        }
    }
}

/// User storage operations.
pub struct UserStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStorage<'a> {
    /// Create a new user storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserTuple> = query_as(&sql).bind(id).fetch_optional(self.pool).await?;
        Ok(row.map(|r| UserRow(r).into_domain()))
    }

    /// Find a user by exact email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row: Option<UserTuple> = query_as(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| UserRow(r).into_domain()))
    }

    /// Create a user from a profile, or return the one that already owns the
    /// email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn create(&self, profile: &IdentityProfile) -> StorageResult<User> {
        let user = User::from_profile(profile);
        let sql = format!(
            r#"
            INSERT INTO users
                (id, email, first_name, last_name, picture_url, provider_id,
                 is_blocked, created_at, updated_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );
        let inserted: Option<UserTuple> = query_as(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.picture_url)
            .bind(&user.provider_id)
            .bind(user.is_blocked)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.last_login_at)
            .fetch_optional(self.pool)
            .await?;

        if let Some(row) = inserted {
            tracing::debug!(user_id = %user.id, "Created user");
            return Ok(UserRow(row).into_domain());
        }

        self.find_by_email(&profile.email)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("User '{}'", profile.email)))
    }

    /// Set `is_blocked`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    pub async fn mark_blocked(&self, id: Uuid) -> StorageResult<()> {
        let result = query("UPDATE users SET is_blocked = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("User '{id}'")));
        }
        Ok(())
    }

    /// Apply a profile update. `NULL` parameters keep the stored value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: &UpdateProfile,
        at: OffsetDateTime,
    ) -> StorageResult<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                picture_url = COALESCE($4, picture_url),
                updated_at = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row: Option<UserTuple> = query_as(&sql)
            .bind(id)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.picture_url)
            .bind(at)
            .fetch_optional(self.pool)
            .await?;

        row.map(|r| UserRow(r).into_domain())
            .ok_or_else(|| StorageError::not_found(format!("User '{id}'")))
    }

    /// Stamp the last sign-in time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    pub async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StorageResult<()> {
        let result = query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("User '{id}'")));
        }
        Ok(())
    }
}
