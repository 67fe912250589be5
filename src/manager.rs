//! Session lifecycle: login, device-link redemption, validation and logout.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::config::SessionSettings;
use crate::error::Error;
use crate::gateway::{OAuthGateway, RemoteProfile, TokenResponse};
use crate::model::{
    BanScope, LinkedTokens, ProviderCredentials, Session, SessionView, TokenPair, User,
};
use crate::secret;
use crate::store::{BanRegistry, IdentityDirectory, InsertOutcome, SessionStore};
use crate::types::{AccessToken, DeviceId, LinkCode, RefreshToken, UserId};

const LINK_NOT_FOUND: &str = "Session not found or already linked";

/// Orchestrates identity resolution, ban enforcement and the session state machine.
///
/// Holds no mutable state of its own. Every mutation goes through the stores.
pub struct SessionManager<G, D, B, S> {
    gateway: Arc<G>,
    directory: Arc<D>,
    bans: Arc<B>,
    sessions: Arc<S>,
    settings: SessionSettings,
}

// Manual Clone: avoid derive adding `G: Clone, ...` bounds.
impl<G, D, B, S> Clone for SessionManager<G, D, B, S> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            directory: self.directory.clone(),
            bans: self.bans.clone(),
            sessions: self.sessions.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<G, D, B, S> SessionManager<G, D, B, S>
where
    G: OAuthGateway,
    D: IdentityDirectory,
    B: BanRegistry,
    S: SessionStore,
{
    #[must_use]
    pub fn new(gateway: G, directory: D, bans: B, sessions: S, settings: SessionSettings) -> Self {
        Self {
            gateway: Arc::new(gateway),
            directory: Arc::new(directory),
            bans: Arc::new(bans),
            sessions: Arc::new(sessions),
            settings,
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Complete the browser login: exchange `code`, resolve the user and open
    /// a pending session.
    ///
    /// Returns only the link code; the tokens stay undisclosed until a device
    /// redeems it.
    ///
    /// # Errors
    ///
    /// - [`Error::BadRequest`] if `code` is empty
    /// - [`Error::InvalidCredentials`] if the provider rejects the code
    /// - [`Error::IdentityNotFound`] if the provider returns no profile
    /// - [`Error::Forbidden`] if the user is banned
    /// - [`Error::LinkCodeExhausted`] if no free link code was found
    pub async fn create_session(&self, code: &str) -> Result<LinkCode, Error> {
        if code.trim().is_empty() {
            return Err(Error::BadRequest("Code is required".into()));
        }

        let token = match self.gateway.exchange_code(code).await {
            Ok(token) if !token.access_token.is_empty() => token,
            Ok(_) => return Err(Error::InvalidCredentials("Invalid access token".into())),
            Err(Error::OAuth { operation, status, .. }) => {
                tracing::warn!(operation, status = ?status, "OAuth code exchange rejected");
                return Err(Error::InvalidCredentials("Invalid access token".into()));
            }
            Err(e) => return Err(e),
        };

        let profile = match self.gateway.fetch_profile(&token).await {
            Ok(profile) if !profile.external_id.0.is_empty() => profile,
            Ok(_) | Err(Error::OAuth { .. }) => {
                return Err(Error::IdentityNotFound("User not found".into()));
            }
            Err(e) => return Err(e),
        };

        let now = OffsetDateTime::now_utc();
        let user = self.resolve_user(profile, &token, now).await?;
        self.ensure_not_banned(&user.id, now).await?;

        let expires_at = expiry(now, self.pending_lifetime(&token))?;
        let tokens = TokenPair {
            access_token: secret::generate_access_token(),
            refresh_token: secret::generate_refresh_token(),
        };

        let attempts = self.settings.link_code_attempts;
        for attempt in 1..=attempts {
            let link_code = secret::generate_link_code();
            let session =
                Session::pending(user.id, link_code.clone(), tokens.clone(), now, expires_at);
            let session_id = session.id;

            match self.sessions.insert(session).await.map_err(Error::store)? {
                InsertOutcome::Inserted => {
                    tracing::info!(
                        session_id = %session_id,
                        user_id = %user.id,
                        "Pending session created"
                    );
                    return Ok(link_code);
                }
                InsertOutcome::LinkCodeTaken => {
                    tracing::warn!(attempt, "Link code collision, regenerating");
                }
            }
        }

        Err(Error::LinkCodeExhausted { attempts })
    }

    /// Claim a pending session for `device_id` and disclose its token pair.
    ///
    /// Single use: a second redemption of the same code fails with
    /// [`Error::NotFound`], as does a code that never existed.
    ///
    /// # Errors
    ///
    /// - [`Error::BadRequest`] if either input is empty
    /// - [`Error::NotFound`] if no unexpired pending session holds the code
    /// - [`Error::IdentityNotFound`] if the owning user is gone
    /// - [`Error::Forbidden`] if the user is banned
    pub async fn redeem_link_code(
        &self,
        link_code: &str,
        device_id: &str,
    ) -> Result<LinkedTokens, Error> {
        let (link_code, device_id) = (link_code.trim(), device_id.trim());
        if link_code.is_empty() || device_id.is_empty() {
            return Err(Error::BadRequest(
                "Device link code and device ID are required".into(),
            ));
        }
        // A malformed code can never have been issued.
        let code: LinkCode = link_code
            .parse()
            .map_err(|_| Error::NotFound(LINK_NOT_FOUND.into()))?;

        let now = OffsetDateTime::now_utc();
        let pending = self
            .sessions
            .find_pending_by_link_code(&code)
            .await
            .map_err(Error::store)?
            .filter(|s| !s.is_expired(now))
            .ok_or_else(|| Error::NotFound(LINK_NOT_FOUND.into()))?;

        let user = self.find_user(&pending.user_id).await?;
        self.ensure_not_banned(&user.id, now).await?;

        let expires_at = expiry(now, self.settings.linked_ttl)?;
        let linked = self
            .sessions
            .link_pending(&pending.id, DeviceId(device_id.to_string()), now, expires_at)
            .await
            .map_err(Error::store)?
            .ok_or_else(|| Error::NotFound(LINK_NOT_FOUND.into()))?;

        tracing::info!(session_id = %linked.id, user_id = %user.id, "Device linked");

        let tokens = linked.tokens();
        Ok(LinkedTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: linked.expires_at,
        })
    }

    /// Authenticate a request by access token, refreshing an expired session
    /// when the matching refresh token is supplied.
    ///
    /// The ban check runs on every call, so a ban takes effect on the next
    /// request rather than at the next login.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorized`] if no linked session matches
    /// - [`Error::TokenExpired`] if expired and the refresh token is absent or wrong
    /// - [`Error::IdentityNotFound`] if the owning user is gone
    /// - [`Error::Forbidden`] if the user is banned
    pub async fn validate_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<SessionView, Error> {
        if access_token.is_empty() {
            return Err(Error::Unauthorized("Authorization token is required".into()));
        }

        let mut session = self
            .sessions
            .find_by_access_token(&AccessToken(access_token.to_string()))
            .await
            .map_err(Error::store)?
            .filter(|s| s.linked().is_some())
            .ok_or_else(|| Error::Unauthorized("Invalid session or not linked".into()))?;

        let now = OffsetDateTime::now_utc();
        if session.is_expired(now) {
            let presented = refresh_token
                .filter(|t| !t.is_empty())
                .map(|t| RefreshToken(t.to_string()));
            if presented.as_ref() != Some(&session.tokens().refresh_token) {
                tracing::warn!(
                    session_id = %session.id,
                    "Expired session presented without valid refresh token"
                );
                return Err(Error::TokenExpired("Session token expired".into()));
            }
            session.expires_at = expiry(now, self.settings.linked_ttl)?;
            tracing::info!(session_id = %session.id, "Session refreshed");
        }

        session.last_used = now;
        // Logged out between the lookup and the write.
        if !self.sessions.update(&session).await.map_err(Error::store)? {
            return Err(Error::Unauthorized("Invalid session or not linked".into()));
        }

        let user = self.find_user(&session.user_id).await?;
        self.ensure_not_banned(&user.id, now).await?;

        tracing::debug!(session_id = %session.id, user_id = %user.id, "Session validated");
        Ok(SessionView::from(&user))
    }

    /// Log out: delete the session owning `access_token`.
    ///
    /// Skips expiry and ban checks so logout can always invalidate.
    ///
    /// # Errors
    ///
    /// - [`Error::BadRequest`] if `access_token` is empty
    /// - [`Error::NotFound`] if no session owns the token
    pub async fn delete_session(&self, access_token: &str) -> Result<(), Error> {
        if access_token.is_empty() {
            return Err(Error::BadRequest("Token is required".into()));
        }

        let deleted = self
            .sessions
            .delete_by_access_token(&AccessToken(access_token.to_string()))
            .await
            .map_err(Error::store)?;
        if !deleted {
            return Err(Error::NotFound("Session not found".into()));
        }

        tracing::info!("User session deleted");
        Ok(())
    }

    // ── Helpers ────────────────────────────────────────────────────

    /// Every operation that resolved a user goes through here before proceeding.
    async fn ensure_not_banned(&self, user_id: &UserId, now: OffsetDateTime) -> Result<(), Error> {
        let ban = self
            .bans
            .find_active_ban(user_id, BanScope::Account, now)
            .await
            .map_err(Error::store)?;

        match ban {
            Some(ban) => {
                tracing::warn!(user_id = %user_id, "Rejected banned user");
                Err(Error::Forbidden { reason: ban.reason })
            }
            None => Ok(()),
        }
    }

    async fn find_user(&self, user_id: &UserId) -> Result<User, Error> {
        self.directory
            .find_by_user_id(user_id)
            .await
            .map_err(Error::store)?
            .ok_or_else(|| Error::IdentityNotFound("User not found".into()))
    }

    async fn resolve_user(
        &self,
        profile: RemoteProfile,
        token: &TokenResponse,
        now: OffsetDateTime,
    ) -> Result<User, Error> {
        if let Some(user) = self
            .directory
            .find_by_external_id(&profile.external_id)
            .await
            .map_err(Error::store)?
        {
            return Ok(user);
        }

        let candidate = User {
            id: UserId::generate(),
            external_id: profile.external_id,
            alias: profile.username.clone(),
            username: profile.username,
            avatar: profile.avatar,
            accent_color: profile.accent_color,
            provider: ProviderCredentials {
                access_token: AccessToken(token.access_token.clone()),
                token_type: token.token_type.clone(),
                refresh_token: token.refresh_token.clone().map(RefreshToken),
            },
            created_at: now,
        };
        let candidate_id = candidate.id;

        // A concurrent first login may have won; insert_if_absent returns its record.
        let user = self
            .directory
            .insert_if_absent(candidate)
            .await
            .map_err(Error::store)?;
        if user.id == candidate_id {
            tracing::info!(user_id = %user.id, "User created");
        }
        Ok(user)
    }

    fn pending_lifetime(&self, token: &TokenResponse) -> Duration {
        token
            .expires_in
            .filter(|&secs| secs > 0)
            .and_then(|secs| i64::try_from(secs).ok())
            .map(Duration::seconds)
            .map_or(self.settings.pending_ttl, |ttl| ttl.min(Duration::days(365)))
    }
}

fn expiry(now: OffsetDateTime, ttl: Duration) -> Result<OffsetDateTime, Error> {
    now.checked_add(ttl)
        .ok_or_else(|| Error::Config(format!("session lifetime {ttl} is out of range")))
}
