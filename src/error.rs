/// Boxed error returned by store implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The OAuth code exchange did not yield a usable access token.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// No remote profile, or the session's user record is gone.
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// The user has an active account ban.
    #[error("User is banned with reason: {reason}")]
    Forbidden { reason: String },

    /// Session or link code absent, or already consumed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No matching linked session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session expired and no valid refresh token was presented.
    #[error("Token expired: {0}")]
    TokenExpired(String),

    /// Caller omitted a required input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid link code: {0:?}")]
    InvalidLinkCode(String),

    #[error("OAuth {operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[cfg(feature = "oauth")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(#[source] BoxError),

    #[error("No free link code after {attempts} attempts")]
    LinkCodeExhausted { attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`Error`], stable across variants with payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    InvalidCredentials,
    IdentityNotFound,
    Forbidden,
    NotFound,
    Unauthorized,
    TokenExpired,
    BadRequest,
    Internal,
}

impl ErrorKind {
    /// HTTP status the inbound layer should answer with.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::InvalidCredentials | Self::Unauthorized | Self::TokenExpired => 401,
            Self::Forbidden => 403,
            Self::IdentityNotFound | Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    /// Machine-readable code, so clients can tell "refresh and retry"
    /// apart from "re-authenticate" under the same status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::IdentityNotFound => "identity_not_found",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::TokenExpired => "token_expired",
            Self::BadRequest => "bad_request",
            Self::Internal => "internal",
        }
    }
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials(_) => ErrorKind::InvalidCredentials,
            Self::IdentityNotFound(_) => ErrorKind::IdentityNotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::TokenExpired(_) => ErrorKind::TokenExpired,
            Self::BadRequest(_) | Self::InvalidLinkCode(_) => ErrorKind::BadRequest,
            Self::OAuth { .. }
            | Self::Store(_)
            | Self::LinkCodeExhausted { .. }
            | Self::Config(_) => ErrorKind::Internal,
            #[cfg(feature = "oauth")]
            Self::Http(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn store(e: BoxError) -> Self {
        Self::Store(e)
    }
}
