//! Identity provider callback.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AuthResult;
use crate::http::cookies::write_tokens;
use crate::middleware::AuthState;
use crate::token::service::SignIn;
use crate::types::User;

/// Body of `POST /auth/google/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Authorization code obtained by the browser.
    pub code: String,
}

/// Successful sign-in response.
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    /// Always `true`.
    pub success: bool,
    /// The signed-in user.
    pub user: User,
}

/// `POST /auth/google/callback`
///
/// Exchanges the code, signs the user in and sets both credential cookies.
/// Any failure is answered with `401 {"success": false, "message": ...}`.
pub async fn google_callback(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(request): Json<CallbackRequest>,
) -> Response {
    match sign_in(&state, &request.code).await {
        Ok(sign_in) => {
            tracing::info!(user_id = %sign_in.user.id, provider = state.identity.name(), "User signed in");
            let jar = write_tokens(jar, &state.cookies, state.tokens.settings(), &sign_in.tokens);
            (
                jar,
                Json(SignInResponse {
                    success: true,
                    user: sign_in.user,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "Sign-in failed");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "message": "Authentication failed",
                })),
            )
                .into_response()
        }
    }
}

async fn sign_in(state: &AuthState, code: &str) -> AuthResult<SignIn> {
    let profile = state.identity.exchange_code(code).await?;
    state.tokens.login(&profile).await
}
