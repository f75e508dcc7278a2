//! Per-request access token verification.

use std::sync::Arc;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::CredentialStore;
use crate::token::jwt::JwtService;
use crate::types::User;

/// Validates access tokens and resolves the authenticated user.
pub struct AccessVerifier {
    store: Arc<dyn CredentialStore>,
    jwt: Arc<JwtService>,
}

impl AccessVerifier {
    /// Creates a new verifier.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, jwt: Arc<JwtService>) -> Self {
        Self { store, jwt }
    }

    /// Verifies an access token and loads its user.
    ///
    /// # Errors
    ///
    /// - `MissingCredential` if no token (or an empty one) is supplied
    /// - `ExpiredCredential`, `InvalidSignature` or `MalformedCredential` from
    ///   token validation
    /// - `UserNotFound` if the subject no longer exists
    /// - `AccountBlocked` if the user is blocked
    pub async fn verify(&self, access_token: Option<&str>) -> AuthResult<User> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let claims = self.jwt.verify(token)?;
        let user_id = claims.user_id()?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.is_blocked {
            return Err(AuthError::AccountBlocked);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    use super::*;
    use crate::storage::InMemoryCredentialStore;
    use crate::token::jwt::{AccessTokenClaims, SigningAlgorithm};
    use crate::types::IdentityProfile;

    struct Fixture {
        store: Arc<InMemoryCredentialStore>,
        jwt: Arc<JwtService>,
        verifier: AccessVerifier,
        user: User,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryCredentialStore::new());
        let jwt = Arc::new(JwtService::new(
            b"verifier-test-secret-verifier-test-secret",
            SigningAlgorithm::HS256,
        ));
        let user = User::from_profile(&IdentityProfile {
            email: "ada@example.com".to_string(),
            first_name: None,
            last_name: None,
            picture_url: None,
            provider_id: "sub".to_string(),
        });
        store.insert_user(user.clone());
        let verifier = AccessVerifier::new(store.clone(), Arc::clone(&jwt));
        Fixture {
            store,
            jwt,
            verifier,
            user,
        }
    }

    #[tokio::test]
    async fn test_verify_returns_user() {
        let f = fixture();
        let token = f.jwt.sign(&f.user.id.to_string(), &f.user.email, "15m").unwrap();

        let user = f.verifier.verify(Some(&token)).await.unwrap();
        assert_eq!(user.id, f.user.id);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let f = fixture();
        assert!(matches!(
            f.verifier.verify(None).await,
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            f.verifier.verify(Some("")).await,
            Err(AuthError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_propagates() {
        let f = fixture();
        let mut claims = AccessTokenClaims::new(f.user.id.to_string(), &f.user.email, Duration::minutes(15)).unwrap();
        claims.exp = (OffsetDateTime::now_utc() - Duration::seconds(5)).unix_timestamp();
        let token = f.jwt.encode(&claims).unwrap();

        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::ExpiredCredential)
        ));
    }

    #[tokio::test]
    async fn test_non_uuid_subject_is_malformed() {
        let f = fixture();
        let token = f.jwt.sign("not-a-uuid", "a@b.c", "15m").unwrap();

        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::MalformedCredential { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let f = fixture();
        let token = f.jwt.sign(&Uuid::new_v4().to_string(), "a@b.c", "15m").unwrap();

        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_blocking_takes_effect_on_next_verification() {
        let f = fixture();
        let token = f.jwt.sign(&f.user.id.to_string(), &f.user.email, "15m").unwrap();
        assert!(f.verifier.verify(Some(&token)).await.is_ok());

        f.store.mark_user_blocked(f.user.id).await.unwrap();

        assert!(matches!(
            f.verifier.verify(Some(&token)).await,
            Err(AuthError::AccountBlocked)
        ));
    }
}
