//! Session Entity
//!
//! An authenticated session is the `{token, secret, expiration}` triple
//! issued by the server on successful login, registration, link or
//! passkey completion. It is an immutable value: renewal replaces it
//! wholesale, there is no in-place mutation. The plaintext form never
//! reaches persistent storage; see
//! [`SessionRecord`] for the encrypted at-rest shape.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Session signing secret, zeroized on drop and redacted in debug output
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SessionSecret(String);

impl SessionSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw secret (base64 of the HMAC key)
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSecret(***)")
    }
}

impl PartialEq for SessionSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Authenticated session value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session token, sent as `oauth_token` on signed requests
    pub token: String,
    /// HMAC signing secret
    pub secret: SessionSecret,
    /// Lifetime in seconds from issuance; 0 means no expiry
    pub expiration: i64,
}

impl Session {
    pub fn new(token: impl Into<String>, secret: impl Into<String>, expiration: i64) -> Self {
        Self {
            token: token.into(),
            secret: SessionSecret::new(secret),
            expiration,
        }
    }

    /// A session is usable only with both halves present
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.secret.is_empty()
    }

    /// Whether this session carries a finite lifetime
    pub fn expires(&self) -> bool {
        self.expiration > 0
    }
}

/// Encryption level of a persisted session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionSecurityLevel {
    /// Sealed with the per-install standard key
    Standard,
    /// Additionally sealed with the hardware-gated biometric key
    Biometric,
}

impl SessionSecurityLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionSecurityLevel::Standard => "STANDARD",
            SessionSecurityLevel::Biometric => "BIOMETRIC",
        }
    }
}

/// Persisted session record: ciphertext plus the metadata needed to
/// reverse it. One record per site identity.
///
/// Invariant: `iv` is present exactly when `level` is `Biometric`; a
/// biometric record's plaintext is only reconstructible after a
/// successful biometric-gated decrypt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Base64 of the sealed session JSON
    pub ciphertext: String,
    /// Encryption level tag
    pub level: SessionSecurityLevel,
    /// Base64 IV for the biometric layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// Absolute expiry (unix millis); absent for non-expiring sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<i64>,
}

impl SessionRecord {
    /// Check the level/IV pairing invariant
    pub fn is_well_formed(&self) -> bool {
        match self.level {
            SessionSecurityLevel::Standard => self.iv.is_none(),
            SessionSecurityLevel::Biometric => self.iv.is_some(),
        }
    }
}
