//! Request Signer
//!
//! Computes the per-request HMAC signature the server verifies
//! independently. Pure and deterministic: equal inputs always produce
//! equal signatures, and both sides canonicalize identically.

use std::collections::BTreeMap;

use platform::crypto;
use platform::transport::HttpMethod;

use crate::error::{CoreError, CoreResult};

/// Name of the signature parameter; always excluded from the base string
pub const SIG_PARAM: &str = "sig";

/// Everything needed to sign one request. Ephemeral: built per request,
/// never persisted.
pub struct SigningSpec<'a> {
    /// Base64-encoded session secret (the HMAC key)
    pub secret: &'a str,
    /// HTTP method of the call
    pub method: HttpMethod,
    /// Canonical endpoint URL
    pub endpoint: &'a str,
    /// Full parameter set (lexicographically ordered by the map)
    pub params: &'a BTreeMap<String, String>,
}

/// Compute the request signature: base64url (no padding) of HMAC-SHA1
/// over the canonical base string, keyed by the decoded session secret.
pub fn sign(spec: &SigningSpec<'_>) -> CoreResult<String> {
    let key = crypto::from_base64(spec.secret)
        .map_err(|_| CoreError::Internal("session secret is not valid base64".to_string()))?;
    let base = base_string(spec.method, spec.endpoint, spec.params);
    Ok(crypto::to_base64_url(&crypto::hmac_sha1(&key, base.as_bytes())))
}

/// Canonical base string:
/// `METHOD&urlencode(endpoint)&urlencode(sortedQueryString(params))`
pub(crate) fn base_string(
    method: HttpMethod,
    endpoint: &str,
    params: &BTreeMap<String, String>,
) -> String {
    let query = params
        .iter()
        .filter(|(key, _)| key.as_str() != SIG_PARAM)
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.as_str(),
        percent_encode(endpoint),
        percent_encode(&query)
    )
}

/// OAuth-style percent encoding: unreserved `A-Za-z0-9 - . _ ~` pass
/// through, everything else becomes uppercase `%XX` per UTF-8 byte.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}
