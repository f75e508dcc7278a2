//! Token pair issuance.

use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::audit::AuditLog;
use crate::error::AuthError;
use crate::storage::CredentialStore;
use crate::token::duration::Lifetime;
use crate::token::jwt::JwtService;
use crate::types::{RefreshToken, User};

/// A freshly issued access/refresh pair, ready for transport delivery.
#[derive(Clone)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Plaintext refresh token. Only its hash is stored.
    pub refresh_token: String,
    /// Id of the persisted refresh record.
    pub refresh_token_id: Uuid,
    /// When the access token expires.
    pub access_expires_at: OffsetDateTime,
    /// When the refresh token expires.
    pub refresh_expires_at: OffsetDateTime,
}

impl fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("refresh_token_id", &self.refresh_token_id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Creates access/refresh pairs and persists the refresh record.
pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    jwt: Arc<JwtService>,
    access_lifetime: Lifetime,
    refresh_lifetime: Lifetime,
    audit: AuditLog,
}

impl TokenIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt: Arc<JwtService>,
        access_lifetime: Lifetime,
        refresh_lifetime: Lifetime,
        audit: AuditLog,
    ) -> Self {
        Self {
            store,
            jwt,
            access_lifetime,
            refresh_lifetime,
            audit,
        }
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_lifetime(&self) -> &Lifetime {
        &self.access_lifetime
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn refresh_lifetime(&self) -> &Lifetime {
        &self.refresh_lifetime
    }

    /// Issues a new pair for the user with `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist, or a storage error.
    pub async fn issue(&self, user_id: Uuid) -> AuthResult<IssuedTokens> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.issue_for(&user).await
    }

    /// Issues a new pair for a user record the caller already holds.
    ///
    /// No existing refresh record is touched.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or persisting the refresh record fails.
    pub async fn issue_for(&self, user: &User) -> AuthResult<IssuedTokens> {
        let (access_token, claims) = self.jwt.sign_for(
            &user.id.to_string(),
            &user.email,
            self.access_lifetime.duration(),
        )?;

        let refresh_token = RefreshToken::generate_token();
        let record = RefreshToken::new(
            RefreshToken::hash_token(&refresh_token),
            user.id,
            self.refresh_lifetime.duration(),
        )?;
        self.store.create_refresh_token(&record).await?;

        tracing::debug!(user_id = %user.id, token_id = %record.id, "Issued token pair");
        self.audit.tokens_issued(user.id, record.id);

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            refresh_token_id: record.id,
            access_expires_at: claims.expires_at(),
            refresh_expires_at: record.expires_at,
        })
    }
}
