//! At-rest encryption ciphers
//!
//! Two layers are defined here:
//! - [`StandardCipher`]: ChaCha20-Poly1305 sealing with a per-install key,
//!   used for every persisted session record.
//! - [`BiometricKeyProvider`]: the opaque interface to a hardware-gated key.
//!   The key lives in the platform keystore, requires a successful biometric
//!   challenge before use, and is invalidated when enrolled biometrics
//!   change. The core never sees key material, only [`Cipher`] handles.

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

/// Cipher operation errors
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("invalid key material")]
    InvalidKey,

    /// Ciphertext too short or structurally broken
    #[error("malformed ciphertext")]
    Malformed,

    /// The hardware key was invalidated (e.g. biometric enrollment changed)
    #[error("key permanently invalidated")]
    KeyInvalidated,
}

/// Length of the ChaCha20-Poly1305 nonce prefix
const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 cipher for the standard session-record layer.
///
/// Seals as `nonce (12 bytes) || ciphertext`.
pub struct StandardCipher {
    cipher: ChaCha20Poly1305,
}

impl StandardCipher {
    /// Required key length in bytes
    pub const KEY_LEN: usize = 32;

    /// Create a cipher from raw key bytes (must be 32 bytes)
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != Self::KEY_LEN {
            return Err(CipherError::InvalidKey);
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }

    /// Encrypt, returning `nonce || ciphertext`
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt `nonce || ciphertext` produced by [`StandardCipher::seal`]
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        if sealed.len() < NONCE_LEN {
            return Err(CipherError::Malformed);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Decrypt)
    }
}

/// A single-direction cipher handle released by a key provider.
///
/// Opaque by design: the session store feeds bytes through it and stores
/// the IV alongside the record, nothing more.
pub trait Cipher: Send {
    /// Transform the input (encrypt or decrypt depending on how the
    /// handle was obtained)
    fn process(&self, data: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// IV bound to this handle, present for encryption handles
    fn iv(&self) -> Option<Vec<u8>>;
}

/// Hardware-gated symmetric key provider (biometric keystore).
///
/// Obtaining a handle implies a successful biometric challenge on the
/// host side; a failed or dismissed prompt surfaces as an error here.
pub trait BiometricKeyProvider: Send + Sync {
    /// Cipher handle for encrypting; carries a fresh IV
    fn encrypt_cipher(&self) -> Result<Box<dyn Cipher>, CipherError>;

    /// Cipher handle for decrypting data sealed under the given IV
    fn decrypt_cipher(&self, iv: &[u8]) -> Result<Box<dyn Cipher>, CipherError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let cipher = StandardCipher::new(&[42u8; 32]).unwrap();
        let sealed = cipher.seal(b"session plaintext").unwrap();
        assert_ne!(sealed, b"session plaintext");
        assert_eq!(cipher.open(&sealed).unwrap(), b"session plaintext");
    }

    #[test]
    fn test_open_rejects_tampering() {
        let cipher = StandardCipher::new(&[7u8; 32]).unwrap();
        let mut sealed = cipher.seal(b"data").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(cipher.open(&sealed), Err(CipherError::Decrypt)));
    }

    #[test]
    fn test_open_rejects_short_input() {
        let cipher = StandardCipher::new(&[7u8; 32]).unwrap();
        assert!(matches!(
            cipher.open(&[0u8; 4]),
            Err(CipherError::Malformed)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = StandardCipher::new(&[1u8; 32]).unwrap();
        let b = StandardCipher::new(&[2u8; 32]).unwrap();
        let sealed = a.seal(b"data").unwrap();
        assert!(b.open(&sealed).is_err());
    }

    #[test]
    fn test_key_length_enforced() {
        assert!(matches!(
            StandardCipher::new(&[0u8; 16]),
            Err(CipherError::InvalidKey)
        ));
    }
}
