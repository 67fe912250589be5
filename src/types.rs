use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::Error;

/// Internal user identifier (ULID).
///
/// Generated once when the user record is first created and never changed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub Ulid);

impl UserId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

/// Session record identifier (ULID).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

/// Identity id assigned by the OAuth provider. Unique per provider account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct ExternalId(pub String);

/// Caller-chosen device identifier, bound to a session on redemption.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct DeviceId(pub String);

/// Opaque bearer credential that authenticates a linked device.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct AccessToken(pub String);

/// Opaque credential that only authorizes expiry extension.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

// Credentials never show up in Debug output (and therefore never in logs).
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshToken(..)")
    }
}

impl AccessToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RefreshToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated device link code (exactly 6 ASCII digits).
///
/// Guaranteed valid by construction: use `"482913".parse::<LinkCode>()`
/// or `LinkCode::try_from(string)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LinkCode(String);

impl LinkCode {
    /// Number of digits in a link code.
    pub const LEN: usize = 6;

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LinkCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LinkCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LinkCode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.len() == Self::LEN && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s))
        } else {
            Err(Error::InvalidLinkCode(s))
        }
    }
}

impl From<LinkCode> for String {
    fn from(c: LinkCode) -> Self {
        c.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_link_code() {
        assert!("482913".parse::<LinkCode>().is_ok());
        assert!("000000".parse::<LinkCode>().is_ok());
    }

    #[test]
    fn invalid_link_code_length() {
        assert!("48291".parse::<LinkCode>().is_err());
        assert!("4829130".parse::<LinkCode>().is_err());
        assert!("".parse::<LinkCode>().is_err());
    }

    #[test]
    fn invalid_link_code_non_digits() {
        assert!("48291a".parse::<LinkCode>().is_err());
        assert!(" 48291".parse::<LinkCode>().is_err());
        // multi-byte chars must not sneak past the length check
        assert!("４８２９１".parse::<LinkCode>().is_err());
    }

    #[test]
    fn link_code_serde_rejects_malformed() {
        let code: LinkCode = serde_json::from_str("\"482913\"").unwrap();
        assert_eq!(code.as_str(), "482913");
        assert!(serde_json::from_str::<LinkCode>("\"abc\"").is_err());
    }

    #[test]
    fn tokens_are_redacted_in_debug() {
        let token = AccessToken::from("super-secret".to_string());
        let refresh = RefreshToken::from("also-secret".to_string());
        assert!(!format!("{token:?}").contains("super-secret"));
        assert!(!format!("{refresh:?}").contains("also-secret"));
    }

    #[test]
    fn user_id_parses_from_display() {
        let id = UserId::generate();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_device(_: &DeviceId) {}
        fn takes_external(_: &ExternalId) {}

        let device = DeviceId::from("id".to_string());
        let external = ExternalId::from("id".to_string());

        takes_device(&device);
        takes_external(&external);
        // takes_device(&external);  // Compile error!
    }
}
