use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::ExternalId;

/// Token response from the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in: None,
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }
}

/// Remote profile of the authenticated provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RemoteProfile {
    pub external_id: ExternalId,
    pub username: String,
    /// Fully resolved avatar URL (empty when the account has none).
    pub avatar: String,
    pub accent_color: u32,
}

impl RemoteProfile {
    #[must_use]
    pub fn new(external_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            external_id: ExternalId(external_id.into()),
            username: username.into(),
            avatar: String::new(),
            accent_color: 0,
        }
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }

    #[must_use]
    pub fn with_accent_color(mut self, color: u32) -> Self {
        self.accent_color = color;
        self
    }
}

/// OAuth provider seam used by the session manager.
///
/// Return [`Error::OAuth`] when the provider rejects a request; the manager
/// maps that to `InvalidCredentials` on exchange and `IdentityNotFound` on
/// profile fetch. Any other error is treated as an internal failure.
pub trait OAuthGateway: Send + Sync + 'static {
    /// Browser redirect target that starts the login flow.
    fn authorization_url(&self) -> String;

    fn exchange_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;

    fn fetch_profile(
        &self,
        token: &TokenResponse,
    ) -> impl Future<Output = Result<RemoteProfile, Error>> + Send;
}
