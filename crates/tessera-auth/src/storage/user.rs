//! User directory trait used by the login flow.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{IdentityProfile, UpdateProfile, User};

/// Lookup and creation of users signing in through an identity provider.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Creates a user from an identity-provider profile.
    ///
    /// If a user with the same email was created concurrently, that user is
    /// returned instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create_user(&self, profile: &IdentityProfile) -> AuthResult<User>;

    /// Records a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    async fn record_login(&self, user_id: Uuid, at: OffsetDateTime) -> AuthResult<()>;

    /// Applies a profile update and returns the stored user.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &UpdateProfile,
        at: OffsetDateTime,
    ) -> AuthResult<User>;
}
