use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

use crate::types::{AccessToken, LinkCode, RefreshToken};

/// Generates a cryptographically random opaque token.
///
/// Returns a 43-character URL-safe string (32 random bytes → base64url).
#[must_use]
pub fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[must_use]
pub fn generate_access_token() -> AccessToken {
    AccessToken(generate_token())
}

#[must_use]
pub fn generate_refresh_token() -> RefreshToken {
    RefreshToken(generate_token())
}

/// Generates a uniformly random 6-digit link code.
#[must_use]
pub fn generate_link_code() -> LinkCode {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    LinkCode::try_from(format!("{n:06}")).expect("six zero-padded digits are a valid link code")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length() {
        assert_eq!(generate_token().len(), 43);
    }

    #[test]
    fn test_token_url_safe() {
        let token = generate_token();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "token should be URL-safe: {}",
            token
        );
    }

    #[test]
    fn test_token_uniqueness() {
        let a = generate_access_token();
        let b = generate_access_token();
        assert_ne!(a, b, "tokens should be unique");
    }

    #[test]
    fn test_link_code_shape() {
        for _ in 0..100 {
            let code = generate_link_code();
            assert_eq!(code.as_str().len(), LinkCode::LEN);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
