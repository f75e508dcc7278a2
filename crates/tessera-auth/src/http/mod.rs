//! HTTP handlers for the cookie session endpoints.
//!
//! # Available Handlers
//!
//! - [`login::google_callback`] - `POST /auth/google/callback`
//! - [`logout::signout`] - `POST /auth/signout` (session required)
//! - [`me::me`] - `GET /auth/me` and `GET /users/me` (session required)
//! - [`profile::update_profile`] - `PUT /users/profile` (session required)

pub mod cookies;
pub mod login;
pub mod logout;
pub mod me;
pub mod profile;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::middleware::{AuthState, require_session};

pub use login::google_callback;
pub use logout::signout;
pub use me::me;
pub use profile::update_profile;

/// Builds the `/auth` and `/users` routes.
pub fn router(state: AuthState) -> Router {
    let protected = Router::new()
        .route("/auth/signout", post(signout))
        .route("/auth/me", get(me))
        .route("/users/me", get(me))
        .route("/users/profile", put(update_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/auth/google/callback", post(google_callback))
        .merge(protected)
        .with_state(state)
}
