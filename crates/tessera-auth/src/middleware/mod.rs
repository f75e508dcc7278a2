//! HTTP middleware for cookie sessions.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use tessera_auth::middleware::{AuthState, CurrentUser, require_session};
//!
//! async fn whoami(CurrentUser(user): CurrentUser) -> String {
//!     user.email
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
//!     .with_state(state);
//! ```

pub mod error;
pub mod session;

pub use error::status_for;
pub use session::{ActiveRefreshToken, AuthState, CurrentUser, SessionEnded, require_session};
