//! Storage traits for users and refresh credentials.
//!
//! # Implementations
//!
//! - [`InMemoryCredentialStore`] - process-local, used in tests and when no
//!   database is configured
//! - `tessera-auth-postgres` - PostgreSQL storage backend

pub mod credential;
pub mod memory;
pub mod user;

pub use credential::{CredentialStore, RevokeOutcome};
pub use memory::InMemoryCredentialStore;
pub use user::UserDirectory;
