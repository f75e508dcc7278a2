//! Token service.
//!
//! Composes the issuer, verifier and rotation engine into the operations the
//! HTTP layer needs:
//!
//! - [`TokenService::authenticate`] - verify, rotating once on expiry
//! - [`TokenService::login`] - sign in a user returned by an identity provider
//! - [`TokenService::logout`] / [`TokenService::revoke`] - explicit revocation
//! - [`TokenService::update_profile`] - self-service profile changes
//!
//! # Usage
//!
//! ```ignore
//! use tessera_auth::token::TokenService;
//!
//! let service = TokenService::new(&config, store.clone(), store)?;
//! let outcome = service.authenticate(access.as_deref(), refresh.as_deref()).await?;
//! if let Some(tokens) = outcome.reissued {
//!     // write both cookies back
//! }
//! ```

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::audit::AuditLog;
use crate::config::{AuthConfig, TokenSettings};
use crate::error::AuthError;
use crate::storage::{CredentialStore, RevokeOutcome, UserDirectory};
use crate::token::issuer::{IssuedTokens, TokenIssuer};
use crate::token::jwt::JwtService;
use crate::token::reuse::ReuseGuard;
use crate::token::rotation::RotationEngine;
use crate::token::verifier::AccessVerifier;
use crate::types::{IdentityProfile, RefreshToken, RevocationReason, UpdateProfile, User};

/// Result of authenticating a request.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// The authenticated user.
    pub user: User,
    /// A replacement pair if the access token had to be rotated.
    pub reissued: Option<IssuedTokens>,
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    /// The signed-in user.
    pub user: User,
    /// The new pair.
    pub tokens: IssuedTokens,
}

/// Facade over the token lifecycle.
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
    users: Arc<dyn UserDirectory>,
    issuer: Arc<TokenIssuer>,
    verifier: AccessVerifier,
    rotation: RotationEngine,
    audit: AuditLog,
    settings: TokenSettings,
}

impl TokenService {
    /// Builds the service from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration does not validate.
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn CredentialStore>,
        users: Arc<dyn UserDirectory>,
    ) -> AuthResult<Self> {
        let settings = config.settings()?;
        let audit = AuditLog::new(config.audit.clone());
        let jwt = Arc::new(JwtService::new(
            config.signing.secret.as_bytes(),
            settings.algorithm,
        ));

        let issuer = Arc::new(TokenIssuer::new(
            Arc::clone(&store),
            Arc::clone(&jwt),
            settings.access_lifetime.clone(),
            settings.refresh_lifetime.clone(),
            audit.clone(),
        ));
        let verifier = AccessVerifier::new(Arc::clone(&store), jwt);
        let guard = ReuseGuard::new(Arc::clone(&store), settings.reuse_threshold, audit.clone());
        let rotation = RotationEngine::new(
            Arc::clone(&store),
            Arc::clone(&issuer),
            guard,
            audit.clone(),
        );

        Ok(Self {
            store,
            users,
            issuer,
            verifier,
            rotation,
            audit,
            settings,
        })
    }

    /// Returns the parsed settings.
    #[must_use]
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Returns the token issuer.
    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Returns the access verifier.
    #[must_use]
    pub fn verifier(&self) -> &AccessVerifier {
        &self.verifier
    }

    /// Returns the rotation engine.
    #[must_use]
    pub fn rotation(&self) -> &RotationEngine {
        &self.rotation
    }

    /// Authenticates a request from its two credentials.
    ///
    /// The access token is verified first. If it is expired, or absent while
    /// a refresh token is present, exactly one rotation is attempted and the
    /// new pair is returned in [`AuthOutcome::reissued`].
    ///
    /// # Errors
    ///
    /// Returns the verification error when no rotation applies, otherwise the
    /// rotation error.
    pub async fn authenticate(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> AuthResult<AuthOutcome> {
        let has_refresh = refresh_token.is_some_and(|v| !v.is_empty());

        let result = match self.verifier.verify(access_token).await {
            Ok(user) => Ok(AuthOutcome {
                user,
                reissued: None,
            }),
            Err(e) if e.triggers_rotation() || (matches!(e, AuthError::MissingCredential) && has_refresh) => {
                self.rotation
                    .rotate(refresh_token)
                    .await
                    .map(|rotation| AuthOutcome {
                        user: rotation.user,
                        reissued: Some(rotation.tokens),
                    })
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.audit.authentication_failed(e);
        }
        result
    }

    /// Signs in a user returned by an identity provider.
    ///
    /// Finds the user by email or creates it, rejects blocked users, records
    /// the login and issues a new pair.
    ///
    /// # Errors
    ///
    /// Returns `AccountBlocked` for blocked users, or a storage error.
    pub async fn login(&self, profile: &IdentityProfile) -> AuthResult<SignIn> {
        let mut user = match self.users.find_user_by_email(&profile.email).await? {
            Some(user) => user,
            None => {
                let user = self.users.create_user(profile).await?;
                tracing::info!(user_id = %user.id, "Created user on first sign-in");
                user
            }
        };

        if user.is_blocked {
            self.audit.authentication_failed(&AuthError::AccountBlocked);
            return Err(AuthError::AccountBlocked);
        }

        let now = OffsetDateTime::now_utc();
        self.users.record_login(user.id, now).await?;
        user.last_login_at = Some(now);
        user.updated_at = now;

        let tokens = self.issuer.issue_for(&user).await?;
        Ok(SignIn { user, tokens })
    }

    /// Applies a self-service profile update for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed fields and `UserNotFound` if
    /// the user no longer exists.
    pub async fn update_profile(&self, user_id: Uuid, update: &UpdateProfile) -> AuthResult<User> {
        update.validate()?;
        if update.is_empty() {
            return self
                .store
                .find_user_by_id(user_id)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        let user = self
            .users
            .update_profile(user_id, update, OffsetDateTime::now_utc())
            .await?;
        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Revokes the refresh token with plaintext `refresh_token`.
    ///
    /// Idempotent: revoking an already-revoked or unknown token succeeds and
    /// never touches `reused_count`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn revoke(
        &self,
        refresh_token: &str,
        reason: RevocationReason,
    ) -> AuthResult<RevokeOutcome> {
        let token_hash = RefreshToken::hash_token(refresh_token);
        let Some(record) = self.store.find_refresh_token(&token_hash).await? else {
            return Ok(RevokeOutcome::NotFound);
        };

        let outcome = self
            .store
            .revoke_refresh_token(&token_hash, reason, OffsetDateTime::now_utc())
            .await?;
        if outcome.is_revoked() {
            self.audit
                .refresh_token_revoked(record.user_id, record.id, reason);
        }
        Ok(outcome)
    }

    /// Signs out: revokes the presented refresh token with reason `logout`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn logout(&self, refresh_token: Option<&str>) -> AuthResult<RevokeOutcome> {
        match refresh_token.filter(|v| !v.is_empty()) {
            Some(value) => self.revoke(value, RevocationReason::Logout).await,
            None => Ok(RevokeOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::storage::InMemoryCredentialStore;
    use crate::token::jwt::{AccessTokenClaims, SigningAlgorithm};

    const SECRET: &str = "service-test-secret-service-test-secret";

    fn config() -> AuthConfig {
        let mut config = AuthConfig::default();
        config.signing.secret = SECRET.to_string();
        config
    }

    fn service() -> (TokenService, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let service = TokenService::new(&config(), store.clone(), store.clone()).unwrap();
        (service, store)
    }

    fn profile() -> IdentityProfile {
        IdentityProfile {
            email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            picture_url: None,
            provider_id: "google-1".to_string(),
        }
    }

    fn expired_access_token(user: &User) -> String {
        let jwt = JwtService::new(SECRET.as_bytes(), SigningAlgorithm::HS256);
        let mut claims = AccessTokenClaims::new(user.id.to_string(), &user.email, Duration::minutes(15)).unwrap();
        claims.exp = (OffsetDateTime::now_utc() - Duration::seconds(5)).unix_timestamp();
        jwt.encode(&claims).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let result = TokenService::new(&AuthConfig::default(), store.clone(), store);
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[test]
    fn test_new_rejects_out_of_range_lifetime() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let mut config = config();
        config.refresh_token_lifetime = "999999999d".to_string();
        let result = TokenService::new(&config, store.clone(), store);
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_login_creates_user_and_issues() {
        let (service, store) = service();

        let sign_in = service.login(&profile()).await.unwrap();

        assert_eq!(sign_in.user.email, "ada@example.com");
        assert!(sign_in.user.last_login_at.is_some());
        let stored = store.find_user_by_id(sign_in.user.id).await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());

        let user = service
            .verifier()
            .verify(Some(&sign_in.tokens.access_token))
            .await
            .unwrap();
        assert_eq!(user.id, sign_in.user.id);
    }

    #[tokio::test]
    async fn test_login_reuses_existing_user() {
        let (service, _) = service();
        let first = service.login(&profile()).await.unwrap();
        let second = service.login(&profile()).await.unwrap();
        assert_eq!(first.user.id, second.user.id);
    }

    #[tokio::test]
    async fn test_login_rejects_blocked_user() {
        let (service, store) = service();
        let first = service.login(&profile()).await.unwrap();
        store.mark_user_blocked(first.user.id).await.unwrap();

        let err = service.login(&profile()).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountBlocked));
        assert_eq!(store.refresh_tokens_for(first.user.id).len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_valid_access_does_not_rotate() {
        let (service, store) = service();
        let sign_in = service.login(&profile()).await.unwrap();

        let outcome = service
            .authenticate(
                Some(&sign_in.tokens.access_token),
                Some(&sign_in.tokens.refresh_token),
            )
            .await
            .unwrap();

        assert_eq!(outcome.user.id, sign_in.user.id);
        assert!(outcome.reissued.is_none());
        assert_eq!(store.refresh_token_count(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_rotates_expired_access() {
        let (service, store) = service();
        let sign_in = service.login(&profile()).await.unwrap();
        let expired = expired_access_token(&sign_in.user);

        let outcome = service
            .authenticate(Some(&expired), Some(&sign_in.tokens.refresh_token))
            .await
            .unwrap();

        let reissued = outcome.reissued.unwrap();
        assert_ne!(reissued.refresh_token, sign_in.tokens.refresh_token);
        let old = store
            .find_refresh_token(&RefreshToken::hash_token(&sign_in.tokens.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.revoked_reason, Some(RevocationReason::Rotated));
    }

    #[tokio::test]
    async fn test_authenticate_missing_access_with_refresh_rotates() {
        let (service, _) = service();
        let sign_in = service.login(&profile()).await.unwrap();

        let outcome = service
            .authenticate(None, Some(&sign_in.tokens.refresh_token))
            .await
            .unwrap();
        assert!(outcome.reissued.is_some());
    }

    #[tokio::test]
    async fn test_authenticate_does_not_rotate_forged_access() {
        let (service, store) = service();
        let sign_in = service.login(&profile()).await.unwrap();
        let forged = JwtService::new(b"another-secret-another-secret-another", SigningAlgorithm::HS256)
            .sign(&sign_in.user.id.to_string(), &sign_in.user.email, "15m")
            .unwrap();

        let err = service
            .authenticate(Some(&forged), Some(&sign_in.tokens.refresh_token))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidSignature));
        let record = store
            .find_refresh_token(&RefreshToken::hash_token(&sign_in.tokens.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(!record.is_revoked);
    }

    #[tokio::test]
    async fn test_authenticate_without_credentials() {
        let (service, _) = service();
        assert!(matches!(
            service.authenticate(None, None).await,
            Err(AuthError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_expired_access_without_refresh() {
        let (service, _) = service();
        let sign_in = service.login(&profile()).await.unwrap();
        let expired = expired_access_token(&sign_in.user);

        assert!(matches!(
            service.authenticate(Some(&expired), None).await,
            Err(AuthError::NoRefreshCredential)
        ));
    }

    #[tokio::test]
    async fn test_revoke_twice_succeeds() {
        let (service, store) = service();
        let sign_in = service.login(&profile()).await.unwrap();
        let value = &sign_in.tokens.refresh_token;

        let first = service.revoke(value, RevocationReason::Logout).await.unwrap();
        let second = service.revoke(value, RevocationReason::Logout).await.unwrap();

        assert_eq!(first, RevokeOutcome::Revoked);
        assert_eq!(second, RevokeOutcome::AlreadyRevoked);
        let record = store
            .find_refresh_token(&RefreshToken::hash_token(value))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.reused_count, 0);
        assert_eq!(record.revoked_reason, Some(RevocationReason::Logout));
    }

    #[tokio::test]
    async fn test_logout_unknown_or_missing_is_ok() {
        let (service, _) = service();
        assert_eq!(service.logout(None).await.unwrap(), RevokeOutcome::NotFound);
        assert_eq!(
            service.logout(Some("never-issued")).await.unwrap(),
            RevokeOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_logged_out_token_counts_as_reuse() {
        let (service, _) = service();
        let sign_in = service.login(&profile()).await.unwrap();
        service
            .logout(Some(&sign_in.tokens.refresh_token))
            .await
            .unwrap();

        let err = service
            .authenticate(None, Some(&sign_in.tokens.refresh_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenReused));
    }

    #[tokio::test]
    async fn test_replay_until_blocked_then_access_fails() {
        let (service, store) = service();
        let sign_in = service.login(&profile()).await.unwrap();
        let stolen = sign_in.tokens.refresh_token.clone();
        let rotated = service.authenticate(None, Some(&stolen)).await.unwrap();
        let fresh = rotated.reissued.unwrap();

        for _ in 0..5 {
            let err = service.authenticate(None, Some(&stolen)).await.unwrap_err();
            assert!(matches!(err, AuthError::RefreshTokenReused));
        }

        let record = store
            .find_refresh_token(&RefreshToken::hash_token(&stolen))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.reused_count, 5);

        // Still-valid access token of the blocked user is refused.
        assert!(matches!(
            service.authenticate(Some(&fresh.access_token), None).await,
            Err(AuthError::AccountBlocked)
        ));
        assert!(matches!(
            service.authenticate(None, Some(&fresh.refresh_token)).await,
            Err(AuthError::AccountBlocked)
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (service, store) = service();
        let sign_in = service.login(&profile()).await.unwrap();

        let update = UpdateProfile {
            picture_url: Some("https://example.com/ada.png".to_string()),
            ..UpdateProfile::default()
        };
        let user = service.update_profile(sign_in.user.id, &update).await.unwrap();
        assert_eq!(user.picture_url.as_deref(), Some("https://example.com/ada.png"));
        assert_eq!(user.first_name.as_deref(), Some("Ada"));

        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.picture_url, user.picture_url);

        let bad = UpdateProfile {
            picture_url: Some("not a url".to_string()),
            ..UpdateProfile::default()
        };
        let err = service.update_profile(user.id, &bad).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));

        let unchanged = service
            .update_profile(user.id, &UpdateProfile::default())
            .await
            .unwrap();
        assert_eq!(unchanged, stored);
    }
}
