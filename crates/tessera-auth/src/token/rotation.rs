//! Refresh token rotation.
//!
//! A rotation attempt moves through
//! `Start -> RefreshPresented -> RefreshValidated -> ReuseChecked -> Rotated`
//! or stops at `Rejected` with a typed error. Each refresh value rotates at
//! most once; any later presentation is handled by the [`ReuseGuard`].

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::audit::AuditLog;
use crate::error::AuthError;
use crate::storage::{CredentialStore, RevokeOutcome};
use crate::token::issuer::{IssuedTokens, TokenIssuer};
use crate::token::reuse::ReuseGuard;
use crate::types::{RefreshToken, RevocationReason, User};

/// A successful rotation.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// The owner of the rotated token.
    pub user: User,
    /// The replacement pair.
    pub tokens: IssuedTokens,
}

/// Exchanges a valid refresh token for a new pair.
pub struct RotationEngine {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    guard: ReuseGuard,
    audit: AuditLog,
}

impl RotationEngine {
    /// Creates a new rotation engine.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: Arc<TokenIssuer>,
        guard: ReuseGuard,
        audit: AuditLog,
    ) -> Self {
        Self {
            store,
            issuer,
            guard,
            audit,
        }
    }

    /// Rotates the presented refresh token.
    ///
    /// # Errors
    ///
    /// - `NoRefreshCredential` if no value (or an empty one) is presented
    /// - `UnknownRefreshToken` if the value was never issued; nothing is written
    /// - `UserNotFound` / `AccountBlocked` for the owning user
    /// - `RefreshTokenReused` if the record is already revoked
    /// - `RefreshTokenExpired` if the record is past its expiry; it is revoked
    ///   with reason `expired`
    pub async fn rotate(&self, refresh_token: Option<&str>) -> AuthResult<Rotation> {
        // 1. Refresh presented
        let value = refresh_token
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::NoRefreshCredential)?;

        // 2. Lookup by hash
        let token_hash = RefreshToken::hash_token(value);
        let record = self
            .store
            .find_refresh_token(&token_hash)
            .await?
            .ok_or(AuthError::UnknownRefreshToken)?;

        let user = self
            .store
            .find_user_by_id(record.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.is_blocked {
            return Err(AuthError::AccountBlocked);
        }

        // 3. Reuse check
        if record.is_revoked {
            self.guard.record(&record).await;
            return Err(AuthError::RefreshTokenReused);
        }

        let now = OffsetDateTime::now_utc();
        if record.is_expired_at(now) {
            self.store
                .revoke_refresh_token(&token_hash, RevocationReason::Expired, now)
                .await?;
            tracing::debug!(user_id = %user.id, token_id = %record.id, "Refresh token expired");
            return Err(AuthError::RefreshTokenExpired);
        }

        // 4. Issue the replacement, then retire the presented token
        let tokens = self.issuer.issue_for(&user).await?;

        let outcome = self
            .store
            .revoke_refresh_token(&token_hash, RevocationReason::Rotated, now)
            .await?;

        match outcome {
            RevokeOutcome::Revoked => {
                self.audit
                    .token_rotated(user.id, record.id, tokens.refresh_token_id);
                Ok(Rotation { user, tokens })
            }
            RevokeOutcome::AlreadyRevoked | RevokeOutcome::NotFound => {
                // Lost the race against another presentation of the same value.
                self.discard(&user, &tokens).await;
                self.guard.record(&record).await;
                Err(AuthError::RefreshTokenReused)
            }
        }
    }

    async fn discard(&self, user: &User, tokens: &IssuedTokens) {
        let hash = RefreshToken::hash_token(&tokens.refresh_token);
        if let Err(e) = self
            .store
            .revoke_refresh_token(
                &hash,
                RevocationReason::ReuseDetected,
                OffsetDateTime::now_utc(),
            )
            .await
        {
            self.audit.write_failed("discard_issued_token", user.id, &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::storage::InMemoryCredentialStore;
    use crate::token::jwt::{JwtService, SigningAlgorithm};
    use crate::types::IdentityProfile;

    struct Fixture {
        store: Arc<InMemoryCredentialStore>,
        issuer: Arc<TokenIssuer>,
        engine: Arc<RotationEngine>,
        user: User,
    }

    fn fixture(threshold: u32) -> Fixture {
        let store = Arc::new(InMemoryCredentialStore::new());
        let jwt = Arc::new(JwtService::new(
            b"rotation-test-secret-rotation-test-secret",
            SigningAlgorithm::HS256,
        ));
        let issuer = Arc::new(TokenIssuer::new(
            store.clone(),
            jwt,
            "15m".parse().unwrap(),
            "7d".parse().unwrap(),
            AuditLog::default(),
        ));
        let guard = ReuseGuard::new(store.clone(), threshold, AuditLog::default());
        let engine = Arc::new(RotationEngine::new(
            store.clone(),
            Arc::clone(&issuer),
            guard,
            AuditLog::default(),
        ));
        let user = User::from_profile(&IdentityProfile {
            email: "ada@example.com".to_string(),
            first_name: None,
            last_name: None,
            picture_url: None,
            provider_id: "sub".to_string(),
        });
        store.insert_user(user.clone());
        Fixture {
            store,
            issuer,
            engine,
            user,
        }
    }

    async fn stored(store: &InMemoryCredentialStore, value: &str) -> RefreshToken {
        store
            .find_refresh_token(&RefreshToken::hash_token(value))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_rotation_issues_new_pair_and_revokes_old() {
        let f = fixture(5);
        let issued = f.issuer.issue(f.user.id).await.unwrap();

        let rotation = f.engine.rotate(Some(&issued.refresh_token)).await.unwrap();

        assert_eq!(rotation.user.id, f.user.id);
        assert_ne!(rotation.tokens.refresh_token, issued.refresh_token);
        let old = stored(&f.store, &issued.refresh_token).await;
        assert!(old.is_revoked);
        assert_eq!(old.revoked_reason, Some(RevocationReason::Rotated));
        assert!(old.revoked_at.is_some());
        let new = stored(&f.store, &rotation.tokens.refresh_token).await;
        assert!(!new.is_revoked);
    }

    #[tokio::test]
    async fn test_rotated_value_never_rotates_again() {
        let f = fixture(5);
        let issued = f.issuer.issue(f.user.id).await.unwrap();
        f.engine.rotate(Some(&issued.refresh_token)).await.unwrap();

        let err = f.engine.rotate(Some(&issued.refresh_token)).await.unwrap_err();

        assert!(matches!(err, AuthError::RefreshTokenReused));
        assert_eq!(stored(&f.store, &issued.refresh_token).await.reused_count, 1);
    }

    #[tokio::test]
    async fn test_missing_refresh_value() {
        let f = fixture(5);
        assert!(matches!(
            f.engine.rotate(None).await,
            Err(AuthError::NoRefreshCredential)
        ));
        assert!(matches!(
            f.engine.rotate(Some("")).await,
            Err(AuthError::NoRefreshCredential)
        ));
    }

    #[tokio::test]
    async fn test_unknown_value_writes_nothing() {
        let f = fixture(5);
        let issued = f.issuer.issue(f.user.id).await.unwrap();
        let before = f.store.refresh_tokens_for(f.user.id);

        let err = f.engine.rotate(Some("never-issued")).await.unwrap_err();

        assert!(matches!(err, AuthError::UnknownRefreshToken));
        assert_eq!(f.store.refresh_tokens_for(f.user.id), before);
        assert!(!stored(&f.store, &issued.refresh_token).await.is_revoked);
    }

    #[tokio::test]
    async fn test_expired_refresh_is_revoked() {
        let f = fixture(5);
        let value = RefreshToken::generate_token();
        let mut record = RefreshToken::new(RefreshToken::hash_token(&value), f.user.id, Duration::days(1)).unwrap();
        record.expires_at = OffsetDateTime::now_utc() - Duration::seconds(5);
        f.store.create_refresh_token(&record).await.unwrap();

        let err = f.engine.rotate(Some(&value)).await.unwrap_err();

        assert!(matches!(err, AuthError::RefreshTokenExpired));
        let record = stored(&f.store, &value).await;
        assert_eq!(record.revoked_reason, Some(RevocationReason::Expired));
        assert_eq!(f.store.refresh_token_count(), 1);
    }

    #[tokio::test]
    async fn test_threshold_blocks_user() {
        let f = fixture(5);
        let issued = f.issuer.issue(f.user.id).await.unwrap();
        let rotation = f.engine.rotate(Some(&issued.refresh_token)).await.unwrap();

        for _ in 0..5 {
            let err = f.engine.rotate(Some(&issued.refresh_token)).await.unwrap_err();
            assert!(matches!(err, AuthError::RefreshTokenReused));
        }

        let user = f.store.find_user_by_id(f.user.id).await.unwrap().unwrap();
        assert!(user.is_blocked);

        // The legitimate successor was revoked by the cascade.
        let successor = stored(&f.store, &rotation.tokens.refresh_token).await;
        assert_eq!(successor.revoked_reason, Some(RevocationReason::ReuseDetected));

        assert!(matches!(
            f.engine.rotate(Some(&rotation.tokens.refresh_token)).await,
            Err(AuthError::AccountBlocked)
        ));
        assert!(matches!(
            f.engine.rotate(Some(&issued.refresh_token)).await,
            Err(AuthError::AccountBlocked)
        ));
    }

    #[tokio::test]
    async fn test_blocked_user_cannot_rotate() {
        let f = fixture(5);
        let issued = f.issuer.issue(f.user.id).await.unwrap();
        f.store.mark_user_blocked(f.user.id).await.unwrap();

        let err = f.engine.rotate(Some(&issued.refresh_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountBlocked));
        assert!(!stored(&f.store, &issued.refresh_token).await.is_revoked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotations_have_one_winner() {
        let f = fixture(100);
        let issued = f.issuer.issue(f.user.id).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&f.engine);
                let value = issued.refresh_token.clone();
                tokio::spawn(async move { engine.rotate(Some(&value)).await })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(rotation) => winners.push(rotation),
                Err(e) => assert!(matches!(e, AuthError::RefreshTokenReused)),
            }
        }

        assert_eq!(winners.len(), 1);
        let active: Vec<_> = f
            .store
            .refresh_tokens_for(f.user.id)
            .into_iter()
            .filter(|t| !t.is_revoked)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, winners[0].tokens.refresh_token_id);
    }
}
