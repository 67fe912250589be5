use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::state::AuthState;
use crate::error::Error;
use crate::gateway::OAuthGateway;
use crate::model::SessionView;
use crate::store::{BanRegistry, IdentityDirectory, SessionStore};

/// Optional header carrying the refresh token for an expired session.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Access token from `Authorization: Bearer <token>`, not yet validated.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<St: Send + Sync> FromRequestParts<St> for BearerToken {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(Self)
            .ok_or_else(|| Error::Unauthorized("Authorization token is required".into()))
    }
}

/// Authenticated caller, resolved through
/// [`SessionManager::validate_session`](crate::SessionManager::validate_session).
///
/// Sends `x-refresh-token` along when present so an expired session is
/// refreshed in the same request.
///
/// ```rust,ignore
/// async fn me(AuthSession(view): AuthSession) -> Json<SessionView> {
///     Json(view)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionView);

impl<G, D, B, S> FromRequestParts<AuthState<G, D, B, S>> for AuthSession
where
    G: OAuthGateway,
    D: IdentityDirectory,
    B: BanRegistry,
    S: SessionStore,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<G, D, B, S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| Error::Unauthorized("Authorization token is required".into()))?;
        let refresh = parts
            .headers
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        state
            .manager
            .validate_session(&token, refresh.as_deref())
            .await
            .map(Self)
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
