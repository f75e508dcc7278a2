//! Trait implementations connecting the PostgreSQL storage to the token
//! engine.

use async_trait::async_trait;
use tessera_auth::{
    AuthError, AuthResult, CredentialStore, IdentityProfile, RefreshToken, RevocationReason,
    RevokeOutcome, UpdateProfile, User, UserDirectory,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{PostgresCredentialStore, StorageError};

fn not_found_as_user(err: StorageError) -> AuthError {
    if err.is_not_found() {
        AuthError::UserNotFound
    } else {
        err.into()
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users().find_by_id(user_id).await?)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens().find_by_hash(token_hash).await?)
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        Ok(self.tokens().create(token).await?)
    }

    async fn save_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        Ok(self.tokens().save(token).await?)
    }

    async fn mark_user_blocked(&self, user_id: Uuid) -> AuthResult<()> {
        self.users()
            .mark_blocked(user_id)
            .await
            .map_err(not_found_as_user)
    }

    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> AuthResult<RevokeOutcome> {
        Ok(self.tokens().revoke(token_hash, reason, at).await?)
    }

    async fn increment_reuse_count(&self, token_hash: &str) -> AuthResult<Option<u32>> {
        Ok(self.tokens().increment_reuse_count(token_hash).await?)
    }

    async fn revoke_user_refresh_tokens(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> AuthResult<u64> {
        Ok(self.tokens().revoke_all_for_user(user_id, reason, at).await?)
    }
}

#[async_trait]
impl UserDirectory for PostgresCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.users().find_by_email(email).await?)
    }

    async fn create_user(&self, profile: &IdentityProfile) -> AuthResult<User> {
        Ok(self.users().create(profile).await?)
    }

    async fn record_login(&self, user_id: Uuid, at: OffsetDateTime) -> AuthResult<()> {
        self.users()
            .record_login(user_id, at)
            .await
            .map_err(not_found_as_user)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &UpdateProfile,
        at: OffsetDateTime,
    ) -> AuthResult<User> {
        self.users()
            .update_profile(user_id, update, at)
            .await
            .map_err(not_found_as_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_user_maps_to_user_not_found() {
        let err = not_found_as_user(StorageError::not_found("User"));
        assert!(matches!(err, AuthError::UserNotFound));

        let err = not_found_as_user(StorageError::conflict("dup"));
        assert!(matches!(err, AuthError::Storage { .. }));
    }
}
