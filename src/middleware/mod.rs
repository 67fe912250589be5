//! Axum adapter for the session manager.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use devicelink::middleware::{DeviceAuthConfig, AuthSession, auth_routes};
//!
//! // 1. Build a SessionManager over your stores
//! let manager = SessionManager::new(AuthClient::new(OAuthConfig::from_env()?), users, bans, sessions, SessionSettings::from_env()?);
//!
//! // 2. Mount the login / link / logout / current-user routes
//! let app = axum::Router::new()
//!     .merge(auth_routes(DeviceAuthConfig::default(), manager.clone()));
//!
//! // 3. Use `AuthSession` in your own handlers (state must be `AuthState`)
//! async fn protected(AuthSession(me): AuthSession) -> String { me.username }
//! ```

mod config;
mod error;
mod extractor;
mod routes;
mod state;

pub use config::DeviceAuthConfig;
pub use error::ErrorBody;
pub use extractor::{AuthSession, BearerToken, REFRESH_TOKEN_HEADER};
pub use routes::auth_routes;
pub use state::AuthState;
