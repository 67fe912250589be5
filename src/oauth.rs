use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::gateway::{OAuthGateway, RemoteProfile, TokenResponse};

/// OAuth2 provider configuration (Discord-compatible defaults).
///
/// Required fields are constructor parameters. Optional overrides via chaining:
///
/// ```rust,ignore
/// use devicelink::OAuthConfig;
///
/// let config = OAuthConfig::new("client-id", "secret", "https://my-app.com/v1/auth/callback".parse()?)
///     .with_scopes(vec!["identify".into(), "guilds".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) redirect_uri: Url,
    pub(crate) authorize_url: Url,
    pub(crate) api_url: Url,
    pub(crate) cdn_url: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            authorize_url: "https://discord.com/oauth2/authorize"
                .parse()
                .expect("valid default URL"),
            api_url: "https://discord.com/api".parse().expect("valid default URL"),
            cdn_url: "https://cdn.discordapp.com".parse().expect("valid default URL"),
            scopes: vec!["identify".into()],
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `OAUTH_CLIENT_ID`
    /// - `OAUTH_CLIENT_SECRET`
    /// - `OAUTH_REDIRECT_URI` (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `OAUTH_AUTHORIZE_URL`, `OAUTH_API_URL`, `OAUTH_CDN_URL`: endpoint overrides
    /// - `OAUTH_SCOPES`: comma-separated scopes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or URLs are invalid.
    pub fn from_env() -> Result<Self, Error> {
        let client_id = std::env::var("OAUTH_CLIENT_ID")
            .map_err(|_| Error::Config("OAUTH_CLIENT_ID is required".into()))?;
        let client_secret = std::env::var("OAUTH_CLIENT_SECRET")
            .map_err(|_| Error::Config("OAUTH_CLIENT_SECRET is required".into()))?;
        let redirect_uri = std::env::var("OAUTH_REDIRECT_URI")
            .map_err(|_| Error::Config("OAUTH_REDIRECT_URI is required".into()))
            .and_then(|s| parse_url("OAUTH_REDIRECT_URI", &s))?;

        let mut config = Self::new(client_id, client_secret, redirect_uri);

        if let Ok(s) = std::env::var("OAUTH_AUTHORIZE_URL") {
            config = config.with_authorize_url(parse_url("OAUTH_AUTHORIZE_URL", &s)?);
        }
        if let Ok(s) = std::env::var("OAUTH_API_URL") {
            config = config.with_api_url(parse_url("OAUTH_API_URL", &s)?);
        }
        if let Ok(s) = std::env::var("OAUTH_CDN_URL") {
            config = config.with_cdn_url(parse_url("OAUTH_CDN_URL", &s)?);
        }
        if let Ok(scopes) = std::env::var("OAUTH_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_authorize_url(mut self, url: Url) -> Self {
        self.authorize_url = url;
        self
    }

    /// Override the API base (token and user endpoints live under it).
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    #[must_use]
    pub fn with_cdn_url(mut self, url: Url) -> Self {
        self.cdn_url = url;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_url.as_str().trim_end_matches('/'))
    }

    fn avatar_url(&self, user_id: &str, avatar: &str) -> String {
        format!(
            "{}/avatars/{user_id}/{avatar}.png",
            self.cdn_url.as_str().trim_end_matches('/')
        )
    }
}

fn parse_url(var: &str, value: &str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}

/// Provider user object as returned by `GET {api}/users/@me`.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    username: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    accent_color: Option<u32>,
}

/// OAuth2 client against the provider's HTTP API.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or timeouts).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Browser redirect target that starts the login flow.
    #[must_use]
    pub fn authorization_url(&self) -> String {
        let scope = self.config.scopes.join(" ");
        let mut url = self.config.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope);
        url.into()
    }

    /// Exchange an authorization code for provider tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the token endpoint rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let scope = self.config.scopes.join(" ");
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(self.config.endpoint("/oauth2/token"))
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Fetch the provider profile for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the user endpoint rejects the token.
    pub async fn get_profile(&self, token: &TokenResponse) -> Result<RemoteProfile, Error> {
        let response = self
            .http
            .get(self.config.endpoint("/users/@me"))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", token.token_type, token.access_token),
            )
            .send()
            .await?;

        let response = Self::ensure_success(response, "profile request").await?;
        let user = response.json::<ProviderUser>().await?;
        Ok(self.profile_from(user))
    }

    fn profile_from(&self, user: ProviderUser) -> RemoteProfile {
        let avatar = user
            .avatar
            .as_deref()
            .map(|hash| self.config.avatar_url(&user.id, hash))
            .unwrap_or_default();
        RemoteProfile::new(user.id, user.username)
            .with_avatar(avatar)
            .with_accent_color(user.accent_color.unwrap_or(0))
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}

impl OAuthGateway for AuthClient {
    fn authorization_url(&self) -> String {
        AuthClient::authorization_url(self)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        AuthClient::exchange_code(self, code).await
    }

    async fn fetch_profile(&self, token: &TokenResponse) -> Result<RemoteProfile, Error> {
        self.get_profile(token).await
    }
}
