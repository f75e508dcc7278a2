//! Profile self-service.

use axum::{Json, extract::State};

use crate::error::AuthError;
use crate::middleware::{AuthState, CurrentUser};
use crate::types::{UpdateProfile, User};

/// `PUT /users/profile`
///
/// Updates the caller's own name and avatar. Fields left out of the body are
/// unchanged.
pub async fn update_profile(
    State(state): State<AuthState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<UpdateProfile>,
) -> Result<Json<User>, AuthError> {
    let user = state.tokens.update_profile(user.id, &update).await?;
    Ok(Json(user))
}
