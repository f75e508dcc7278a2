//! Schema bootstrap.

use sqlx_core::query::query;

use crate::{PgPool, StorageResult};

/// Statements run by [`migrate`], in order. Each is idempotent.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        first_name TEXT,
        last_name TEXT,
        picture_url TEXT,
        provider_id TEXT,
        is_blocked BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_login_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id UUID PRIMARY KEY,
        token_hash TEXT NOT NULL UNIQUE,
        user_id UUID NOT NULL REFERENCES users (id),
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        is_revoked BOOLEAN NOT NULL DEFAULT FALSE,
        revoked_at TIMESTAMPTZ,
        revoked_reason TEXT,
        reused_count INTEGER NOT NULL DEFAULT 0 CHECK (reused_count >= 0)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS refresh_tokens_active_user_idx
        ON refresh_tokens (user_id)
        WHERE NOT is_revoked
    "#,
];

/// Creates the `users` and `refresh_tokens` tables.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub async fn migrate(pool: &PgPool) -> StorageResult<()> {
    for statement in SCHEMA {
        query(statement).execute(pool).await?;
    }
    tracing::info!("Credential store schema is up to date");
    Ok(())
}
