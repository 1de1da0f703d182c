//! HMAC-SHA256 body signatures carried in the `HashSHA256` header

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid signing key")]
pub struct InvalidKey;

/// Hex HMAC-SHA256 of `body` under `key`
pub fn sign(key: &[u8], body: &[u8]) -> Result<String, InvalidKey> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| InvalidKey)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature produced by [`sign`]
pub fn verify(key: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
