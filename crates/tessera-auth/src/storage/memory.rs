//! In-memory credential store.
//!
//! Backed by [`DashMap`]; every atomic helper runs under the entry guard of
//! the record it touches, so concurrent increments and revocations of the
//! same token serialize on its shard lock.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::credential::{CredentialStore, RevokeOutcome};
use crate::storage::user::UserDirectory;
use crate::types::{IdentityProfile, RefreshToken, RevocationReason, UpdateProfile, User};

/// Process-local store for users and refresh tokens.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    tokens: DashMap<String, RefreshToken>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user record.
    pub fn insert_user(&self, user: User) {
        self.emails.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user);
    }

    /// Returns every refresh token owned by `user_id`, oldest first.
    #[must_use]
    pub fn refresh_tokens_for(&self, user_id: Uuid) -> Vec<RefreshToken> {
        let mut tokens: Vec<RefreshToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        tokens
    }

    /// Number of stored refresh tokens.
    #[must_use]
    pub fn refresh_token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn find_refresh_token(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.get(token_hash).map(|t| t.value().clone()))
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        match self.tokens.entry(token.token_hash.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage("Refresh token hash already exists")),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(())
            }
        }
    }

    async fn save_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        let mut stored = self
            .tokens
            .get_mut(&token.token_hash)
            .ok_or_else(|| AuthError::storage("Refresh token not found"))?;
        stored.is_revoked = token.is_revoked;
        stored.revoked_at = token.revoked_at;
        stored.revoked_reason = token.revoked_reason;
        stored.reused_count = token.reused_count;
        Ok(())
    }

    async fn mark_user_blocked(&self, user_id: Uuid) -> AuthResult<()> {
        let mut user = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        user.is_blocked = true;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> AuthResult<RevokeOutcome> {
        let Some(mut token) = self.tokens.get_mut(token_hash) else {
            return Ok(RevokeOutcome::NotFound);
        };
        if token.revoke(reason, at) {
            Ok(RevokeOutcome::Revoked)
        } else {
            Ok(RevokeOutcome::AlreadyRevoked)
        }
    }

    async fn increment_reuse_count(&self, token_hash: &str) -> AuthResult<Option<u32>> {
        Ok(self.tokens.get_mut(token_hash).map(|mut token| {
            token.reused_count = token.reused_count.saturating_add(1);
            token.reused_count
        }))
    }

    async fn revoke_user_refresh_tokens(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
        at: OffsetDateTime,
    ) -> AuthResult<u64> {
        let mut revoked = 0;
        for mut token in self.tokens.iter_mut() {
            if token.user_id == user_id && token.revoke(reason, at) {
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl UserDirectory for InMemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.find_user_by_id(id).await
    }

    async fn create_user(&self, profile: &IdentityProfile) -> AuthResult<User> {
        match self.emails.entry(profile.email.clone()) {
            Entry::Occupied(existing) => self
                .users
                .get(existing.get())
                .map(|u| u.value().clone())
                .ok_or(AuthError::UserNotFound),
            Entry::Vacant(slot) => {
                let user = User::from_profile(profile);
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    async fn record_login(&self, user_id: Uuid, at: OffsetDateTime) -> AuthResult<()> {
        let mut user = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        user.last_login_at = Some(at);
        user.updated_at = at;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &UpdateProfile,
        at: OffsetDateTime,
    ) -> AuthResult<User> {
        let mut user = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        update.apply_to(&mut user, at);
        Ok(user.clone())
    }
}
