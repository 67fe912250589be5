use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::config::DeviceAuthConfig;
use super::extractor::{AuthSession, BearerToken};
use super::state::AuthState;
use crate::error::Error;
use crate::gateway::OAuthGateway;
use crate::manager::SessionManager;
use crate::model::{LinkedTokens, SessionView};
use crate::store::{BanRegistry, IdentityDirectory, SessionStore};
use crate::types::LinkCode;

/// Create the device-link authentication router.
///
/// | Route | Operation |
/// |---|---|
/// | `GET {auth_path}` | redirect to the provider |
/// | `GET {auth_path}/callback?code=` | create a pending session, answer `{"linkCode"}` |
/// | `POST {auth_path}/link` | redeem `{"linkCode","deviceId"}` for a token pair |
/// | `POST {auth_path}/logout` | delete the bearer's session |
/// | `GET {user_path}` | the bearer's session view |
pub fn auth_routes<G, D, B, S>(
    config: DeviceAuthConfig,
    manager: SessionManager<G, D, B, S>,
) -> Router
where
    G: OAuthGateway,
    D: IdentityDirectory,
    B: BanRegistry,
    S: SessionStore,
{
    let DeviceAuthConfig { auth_path, user_path } = config;

    Router::new()
        .route(&auth_path, get(login::<G, D, B, S>))
        .route(&format!("{auth_path}/callback"), get(callback::<G, D, B, S>))
        .route(&format!("{auth_path}/link"), post(link_device::<G, D, B, S>))
        .route(&format!("{auth_path}/logout"), post(logout::<G, D, B, S>))
        .route(&user_path, get(current_session))
        .with_state(AuthState::new(manager))
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<G: OAuthGateway, D: IdentityDirectory, B: BanRegistry, S: SessionStore>(
    State(state): State<AuthState<G, D, B, S>>,
) -> Redirect {
    Redirect::to(&state.manager.gateway().authorization_url())
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkCodeResponse {
    link_code: LinkCode,
}

async fn callback<G: OAuthGateway, D: IdentityDirectory, B: BanRegistry, S: SessionStore>(
    State(state): State<AuthState<G, D, B, S>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<LinkCodeResponse>, Error> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from provider");
        return Err(Error::InvalidCredentials(desc.to_string()));
    }

    let code = params.code.unwrap_or_default();
    let link_code = state.manager.create_session(&code).await?;

    Ok(Json(LinkCodeResponse { link_code }))
}

// ── Link ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRequest {
    #[serde(default)]
    link_code: String,
    #[serde(default)]
    device_id: String,
}

async fn link_device<G: OAuthGateway, D: IdentityDirectory, B: BanRegistry, S: SessionStore>(
    State(state): State<AuthState<G, D, B, S>>,
    Json(body): Json<LinkRequest>,
) -> Result<Json<LinkedTokens>, Error> {
    state
        .manager
        .redeem_link_code(&body.link_code, &body.device_id)
        .await
        .map(Json)
}

// ── Logout ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn logout<G: OAuthGateway, D: IdentityDirectory, B: BanRegistry, S: SessionStore>(
    State(state): State<AuthState<G, D, B, S>>,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, Error> {
    state.manager.delete_session(&token).await?;
    Ok(Json(MessageResponse {
        message: "User session deleted successfully",
    }))
}

// ── Current session ────────────────────────────────────────────────

async fn current_session(AuthSession(view): AuthSession) -> Json<SessionView> {
    Json(view)
}
