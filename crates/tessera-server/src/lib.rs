//! Tessera HTTP server.
//!
//! Wires the token engine, a credential store and the Google identity
//! provider into an axum application.

pub mod config;
pub mod observability;
pub mod server;

pub use server::{ServerBuilder, TesseraServer, build_app};
