//! Picture id obfuscation for NetEase image URLs
//!
//! NetEase serves artwork at `/<token>/<pic_id>.jpg` where the token is
//! derived from the numeric picture id: XOR with a fixed key, MD5, then
//! URL-safe base64 of the raw digest.

use base64::{Engine as _, engine::general_purpose};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::digest;
use crate::error::WidgetError;

lazy_static! {
    static ref ID_XOR_KEY: Vec<u8> = "3go8&$8*3*3h0k(2)2".as_bytes().to_vec();
    static ref PIC_ID: Regex = Regex::new(r"^[0-9]{5,}$").unwrap();
}

pub struct Crypto;

impl Crypto {
    /// Derive the opaque path token for a numeric picture id.
    ///
    /// Returns `None` for anything that isn't at least five ASCII digits.
    pub fn encrypt_id(id: &str) -> Option<String> {
        match Self::try_encrypt_id(id) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!("Picture id {:?} not encryptable: {}", id, e);
                None
            }
        }
    }

    fn try_encrypt_id(id: &str) -> Result<String, WidgetError> {
        if !PIC_ID.is_match(id) {
            return Err(WidgetError::MalformedInput(
                "expected 5 or more decimal digits".to_string(),
            ));
        }

        let mixed = Self::xor_with_key(id.as_bytes());
        let hex = digest::digest_hex(&mixed);
        let raw = hex::decode(&hex).map_err(|e| WidgetError::Unexpected(e.to_string()))?;

        Ok(general_purpose::STANDARD
            .encode(raw)
            .replace('/', "_")
            .replace('+', "-"))
    }

    /// XOR each byte with the key, cycling the key by position
    fn xor_with_key(data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(ID_XOR_KEY.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

/// Build a direct high-resolution artwork URL for a picture id.
///
/// `size` is NetEase's `WxH` form, e.g. `2000y2000`.
pub fn build_asset_url(asset_host: &str, pic_id: &str, size: &str) -> Option<String> {
    let id = pic_id.trim();
    let token = Crypto::encrypt_id(id)?;
    Some(format!(
        "https://{}/{}/{}.jpg?param={}",
        asset_host, token, id, size
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tokens() {
        assert_eq!(
            Crypto::encrypt_id("109951163").as_deref(),
            Some("jcnBjKY5pLySU0gZPDsAJg==")
        );
        assert_eq!(
            Crypto::encrypt_id("109951165561716451").as_deref(),
            Some("kGCnJbZJiLjTdwUZaqYEIg==")
        );
        // Base64 would contain '/' here without the substitution
        assert_eq!(
            Crypto::encrypt_id("12345").as_deref(),
            Some("SOJgz_ObU1tgyRJptBgDTA==")
        );
    }

    #[test]
    fn test_deterministic_and_url_safe() {
        for id in ["12345", "109951163", "18734467203498211", "99999999999999999999"] {
            let first = Crypto::encrypt_id(id).unwrap();
            let second = Crypto::encrypt_id(id).unwrap();
            assert_eq!(first, second);
            assert!(!first.contains('/'));
            assert!(!first.contains('+'));
        }
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert_eq!(Crypto::encrypt_id(""), None);
        assert_eq!(Crypto::encrypt_id("1234"), None);
        assert_eq!(Crypto::encrypt_id("12a456"), None);
        assert_eq!(Crypto::encrypt_id(" 123456"), None);
        assert_eq!(Crypto::encrypt_id("-123456"), None);
        assert_eq!(Crypto::encrypt_id("１２３４５"), None);
    }

    #[test]
    fn test_build_asset_url() {
        assert_eq!(
            build_asset_url("p3.music.126.net", " 109951163 ", "2000y2000").as_deref(),
            Some("https://p3.music.126.net/jcnBjKY5pLySU0gZPDsAJg==/109951163.jpg?param=2000y2000")
        );
        assert_eq!(build_asset_url("p3.music.126.net", "42", "2000y2000"), None);
    }
}
