//! HTTP server for pushr.
//!
//! Serves release listings, per-channel "latest" resolution, and streamed
//! payload upload/download over a small JSON API, with separate read and
//! write tokens.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Access, AllowAllAuth, AuthProvider, Credentials, TokenAuth};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{shutdown_signal, PushrServer};
pub use state::AppState;
