use std::collections::HashMap;

use crate::error::Error;
use crate::gateway::{OAuthGateway, RemoteProfile, TokenResponse};

/// Provider stand-in: known codes map to profiles, everything else is rejected.
///
/// `"empty-token"` exchanges to an empty access token and `"no-profile"`
/// exchanges fine but has no profile behind it. Known codes starting with
/// `"no-expiry"` carry no `expires_in`.
#[derive(Default)]
pub(crate) struct StubGateway {
    profiles: HashMap<String, RemoteProfile>,
}

impl StubGateway {
    pub(crate) fn with(mut self, code: &str, profile: RemoteProfile) -> Self {
        self.profiles.insert(code.to_string(), profile);
        self
    }
}

impl OAuthGateway for StubGateway {
    fn authorization_url(&self) -> String {
        "https://provider.example/authorize?client_id=test".into()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        match code {
            "empty-token" => Ok(TokenResponse::new("", "Bearer")),
            "no-profile" => Ok(TokenResponse::new("provider-no-profile", "Bearer")),
            _ if self.profiles.contains_key(code) => {
                let token = TokenResponse::new(format!("provider-{code}"), "Bearer")
                    .with_refresh_token(format!("provider-refresh-{code}"));
                if code.starts_with("no-expiry") {
                    Ok(token)
                } else {
                    Ok(token.with_expires_in(604_800))
                }
            }
            _ => Err(Error::OAuth {
                operation: "token exchange",
                status: Some(400),
                detail: "invalid_grant".into(),
            }),
        }
    }

    async fn fetch_profile(&self, token: &TokenResponse) -> Result<RemoteProfile, Error> {
        let code = token.access_token.trim_start_matches("provider-");
        self.profiles.get(code).cloned().ok_or(Error::OAuth {
            operation: "profile request",
            status: Some(401),
            detail: "401: Unauthorized".into(),
        })
    }
}
