//! PostgreSQL storage backend for Tessera Auth
//!
//! Provides persistent storage for users and refresh tokens. Every atomic
//! helper of [`CredentialStore`](tessera_auth::CredentialStore) is a single
//! conditional `UPDATE ... RETURNING`, so concurrent rotations and replays
//! serialize on the row lock.
//!
//! # Example
//!
//! ```ignore
//! use tessera_auth_postgres::PostgresCredentialStore;
//!
//! let store = PostgresCredentialStore::connect("postgres://localhost/tessera", 10).await?;
//! store.migrate().await?;
//! let store = std::sync::Arc::new(store);
//! let service = TokenService::new(&config, store.clone(), store)?;
//! ```

pub mod schema;
pub mod store;
pub mod token;
pub mod user;

use std::sync::Arc;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use tessera_auth::AuthError;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use token::{RefreshTokenRow, TokenStorage};
pub use user::{UserRow, UserStorage};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Requested row was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped to the domain type.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StorageError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidData` error.
    #[must_use]
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::storage(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Credential Store
// =============================================================================

/// PostgreSQL implementation of
/// [`CredentialStore`](tessera_auth::CredentialStore) and
/// [`UserDirectory`](tessera_auth::UserDirectory).
#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        schema::migrate(&self.pool).await
    }

    /// Token storage bound to this pool.
    #[must_use]
    pub fn tokens(&self) -> TokenStorage<'_> {
        TokenStorage::new(&self.pool)
    }

    /// User storage bound to this pool.
    #[must_use]
    pub fn users(&self) -> UserStorage<'_> {
        UserStorage::new(&self.pool)
    }
}
