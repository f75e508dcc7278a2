//! Sign-out.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::http::cookies::clear_tokens;
use crate::middleware::{ActiveRefreshToken, AuthState, CurrentUser, SessionEnded};

/// `POST /auth/signout`
///
/// Revokes the session's refresh token with reason `logout` and clears both
/// cookies. The cookies are cleared even if revocation fails.
pub async fn signout(
    State(state): State<AuthState>,
    CurrentUser(user): CurrentUser,
    Extension(ActiveRefreshToken(refresh_token)): Extension<ActiveRefreshToken>,
    jar: CookieJar,
) -> Response {
    let jar = clear_tokens(jar, &state.cookies);

    let mut response = match state.tokens.logout(refresh_token.as_deref()).await {
        Ok(outcome) => {
            tracing::info!(user_id = %user.id, ?outcome, "User signed out");
            (jar, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => (jar, e).into_response(),
    };

    response.extensions_mut().insert(SessionEnded);
    response
}
