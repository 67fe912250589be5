#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod gateway;
pub mod manager;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod model;
#[cfg(feature = "oauth")]
pub mod oauth;
pub mod secret;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::SessionSettings;
pub use error::{BoxError, Error, ErrorKind};
pub use gateway::{OAuthGateway, RemoteProfile, TokenResponse};
pub use manager::SessionManager;
#[cfg(feature = "memory")]
pub use memory::{MemoryBanRegistry, MemoryIdentityDirectory, MemorySessionStore};
pub use model::{
    Ban, BanScope, LinkedTokens, ProviderCredentials, Session, SessionState, SessionView, User,
};
#[cfg(feature = "oauth")]
pub use oauth::{AuthClient, OAuthConfig};
pub use store::{BanRegistry, IdentityDirectory, InsertOutcome, SessionStore};
pub use types::{AccessToken, DeviceId, ExternalId, LinkCode, RefreshToken, SessionId, UserId};
