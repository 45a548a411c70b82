//! Random session ids and refresh secrets, and their wire encodings.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use keyturn_core::error::CoreError;
use rand::rngs::OsRng;
use rand::TryRngCore;

/// Length in bytes of session ids and refresh secrets.
pub const SECRET_LEN: usize = 32;

/// Draw [`SECRET_LEN`] bytes from the operating system RNG.
pub fn random_bytes() -> Result<[u8; SECRET_LEN], CoreError> {
    let mut buf = [0u8; SECRET_LEN];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| CoreError::Internal(format!("entropy source failure: {e}")))?;
    Ok(buf)
}

/// Session ids use standard base64 without padding.
pub fn encode_session_id(bytes: &[u8]) -> String {
    STANDARD_NO_PAD.encode(bytes)
}

/// Refresh tokens use URL-safe base64 without padding.
pub fn encode_refresh_token(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn decode_refresh_token(token: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(token)
}

/// Leading characters of a session id, safe to put in logs.
pub fn session_id_prefix(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_are_not_repeated() {
        assert_ne!(random_bytes().unwrap(), random_bytes().unwrap());
    }

    #[test]
    fn refresh_token_is_url_safe() {
        let bytes = [0xfb_u8; SECRET_LEN];
        let token = encode_refresh_token(&bytes);
        assert!(!token.contains('+') && !token.contains('/') && !token.contains('='));
        assert_eq!(decode_refresh_token(&token).unwrap(), bytes);
    }

    #[test]
    fn session_id_is_standard_base64() {
        let id = encode_session_id(&[0xfb_u8; SECRET_LEN]);
        assert_eq!(id.len(), 43);
        assert!(id.contains('+') || id.contains('/'));
    }

    #[test]
    fn malformed_refresh_token_fails_to_decode() {
        assert!(decode_refresh_token("not base64url!").is_err());
        assert!(decode_refresh_token("a+b/").is_err());
    }

    #[test]
    fn prefix_of_short_id_is_whole_id() {
        assert_eq!(session_id_prefix("abc"), "abc");
        assert_eq!(session_id_prefix("abcdefghijkl"), "abcdefgh");
    }
}
