//! Cookie session middleware.
//!
//! [`require_session`] reads both credential cookies, runs
//! [`TokenService::authenticate`] and, when a rotation happened, writes the
//! replacement pair back as `Set-Cookie` headers on the response. When the
//! session is dead (replayed, blocked, unknown or expired refresh token) both
//! cookies are cleared on the 401.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::config::CookieConfig;
use crate::error::{AuthError, ErrorCategory};
use crate::federation::IdentityProvider;
use crate::http::cookies::{clear_tokens, read_tokens, write_tokens};
use crate::token::service::TokenService;
use crate::types::User;

/// Shared state for the auth routes and middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token lifecycle service.
    pub tokens: Arc<TokenService>,

    /// Identity provider used by the login callback.
    pub identity: Arc<dyn IdentityProvider>,

    /// Cookie transport configuration.
    pub cookies: CookieConfig,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(
        tokens: Arc<TokenService>,
        identity: Arc<dyn IdentityProvider>,
        cookies: CookieConfig,
    ) -> Self {
        Self {
            tokens,
            identity,
            cookies,
        }
    }
}

/// The refresh token currently valid for this request's session.
///
/// After a rotation this is the replacement, not the value the browser sent.
#[derive(Clone)]
pub struct ActiveRefreshToken(pub Option<String>);

impl fmt::Debug for ActiveRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActiveRefreshToken(<redacted>)")
    }
}

/// Response marker set by handlers that end the session, so the middleware
/// does not re-set cookies the handler just cleared.
#[derive(Debug, Clone, Copy)]
pub struct SessionEnded;

/// Middleware that rejects requests without a valid session.
///
/// # Errors
///
/// Responds with the [`AuthError`] from authentication.
pub async fn require_session(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let presented = read_tokens(&jar, &state.cookies);

    let outcome = match state
        .tokens
        .authenticate(
            presented.access_token.as_deref(),
            presented.refresh_token.as_deref(),
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) if ends_session(&e) => {
            let jar = clear_tokens(jar, &state.cookies);
            return Ok((jar, e).into_response());
        }
        Err(e) => return Err(e),
    };

    let active_refresh = match &outcome.reissued {
        Some(tokens) => Some(tokens.refresh_token.clone()),
        None => presented.refresh_token,
    };
    tracing::debug!(
        user_id = %outcome.user.id,
        rotated = outcome.reissued.is_some(),
        "Session authenticated"
    );

    request.extensions_mut().insert(outcome.user);
    request
        .extensions_mut()
        .insert(ActiveRefreshToken(active_refresh));

    let response = next.run(request).await;

    match outcome.reissued {
        Some(tokens) if response.extensions().get::<SessionEnded>().is_none() => {
            let jar = write_tokens(jar, &state.cookies, state.tokens.settings(), &tokens);
            Ok((jar, response).into_response())
        }
        _ => Ok(response),
    }
}

/// Failures after which the presented cookies can never succeed again.
fn ends_session(error: &AuthError) -> bool {
    error.is_security_event() || error.category() == ErrorCategory::Session
}

/// Extractor for the user authenticated by [`require_session`].
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthError::MissingCredential)
    }
}
