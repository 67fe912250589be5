//! Records persisted by the identity, ban and session stores.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{AccessToken, DeviceId, ExternalId, LinkCode, RefreshToken, SessionId, UserId};

/// Provider credentials captured when the user record was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub access_token: AccessToken,
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
}

/// Local user record, one per external identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub external_id: ExternalId,
    pub username: String,
    pub alias: String,
    pub avatar: String,
    pub accent_color: u32,
    pub provider: ProviderCredentials,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum BanScope {
    /// Blocks every session operation for the user.
    Account,
}

/// Ban issued by an administrator. Read-only from this crate's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    pub user_id: UserId,
    pub scope: BanScope,
    pub reason: String,
    /// `None` means indefinite.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl Ban {
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Access + refresh pair generated together when a session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

/// Session created at login and not yet claimed by a device.
///
/// The tokens are reserved here but are never disclosed and never authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLink {
    pub link_code: LinkCode,
    pub tokens: TokenPair,
}

/// Session claimed by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedDevice {
    pub device_id: DeviceId,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    Pending(PendingLink),
    Linked(LinkedDevice),
}

/// Session record: a shared envelope plus the two-state link status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub state: SessionState,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_used: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Create a pending session with fresh tokens.
    #[must_use]
    pub fn pending(
        user_id: UserId,
        link_code: LinkCode,
        tokens: TokenPair,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            user_id,
            state: SessionState::Pending(PendingLink { link_code, tokens }),
            created_at: now,
            last_used: now,
            expires_at,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenPair {
        match &self.state {
            SessionState::Pending(p) => &p.tokens,
            SessionState::Linked(l) => &l.tokens,
        }
    }

    #[must_use]
    pub fn link_code(&self) -> Option<&LinkCode> {
        match &self.state {
            SessionState::Pending(p) => Some(&p.link_code),
            SessionState::Linked(_) => None,
        }
    }

    #[must_use]
    pub fn linked(&self) -> Option<&LinkedDevice> {
        match &self.state {
            SessionState::Linked(l) => Some(l),
            SessionState::Pending(_) => None,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Transition `Pending` → `Linked`. Returns `false` (and leaves the
    /// session untouched) if it was already linked.
    pub fn link(
        &mut self,
        device_id: DeviceId,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> bool {
        let SessionState::Pending(pending) = &self.state else {
            return false;
        };
        self.state = SessionState::Linked(LinkedDevice {
            device_id,
            tokens: pending.tokens.clone(),
        });
        self.last_used = now;
        self.expires_at = expires_at;
        true
    }
}

/// Tokens disclosed to the device on successful redemption.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedTokens {
    #[serde(rename = "token")]
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Identity view attached to an authenticated request. Carries no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(rename = "ulid")]
    pub user_id: UserId,
    pub username: String,
    pub alias: String,
    pub avatar: String,
    pub accent_color: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for SessionView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            alias: user.alias.clone(),
            avatar: user.avatar.clone(),
            accent_color: user.accent_color,
            created_at: user.created_at,
        }
    }
}
