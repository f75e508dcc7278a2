//! Current user.

use axum::Json;

use crate::middleware::CurrentUser;
use crate::types::User;

/// `GET /auth/me`, also served as `GET /users/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
