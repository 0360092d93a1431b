//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a single-use request nonce: `<unix millis>_<random>`
///
/// The timestamp prefix keeps nonces roughly ordered so servers can
/// apply a replay window without tracking every value forever.
pub fn nonce() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{}_{}", millis, to_base64_url(&random_bytes(12)))
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute HMAC-SHA1 (the request-signing MAC of the wire protocol)
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <Hmac<Sha1> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Encode bytes as standard base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode standard base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Encode bytes as URL-safe base64 without padding
pub fn to_base64_url(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe unpadded base64 to bytes
pub fn from_base64_url(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::URL_SAFE_NO_PAD.decode(s)
}

/// PKCE verifier/challenge pair (RFC 7636, S256 method)
///
/// Generated before the SSO authorization request; the challenge travels
/// with the request, the verifier is presented at the token endpoint.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// High-entropy code verifier
    pub verifier: String,
    /// `BASE64URL(SHA256(verifier))`
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair with a 64-byte random verifier
    pub fn generate() -> Self {
        let verifier = to_base64_url(&random_bytes(64));
        let challenge = to_base64_url(&sha256(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}
