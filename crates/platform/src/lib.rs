//! Platform Crate - Technical Infrastructure
//!
//! This crate provides the technical foundations the identity core builds on:
//! - Cryptographic utilities (HMAC-SHA1, SHA-256, Base64, nonces, PKCE)
//! - At-rest encryption ciphers and the biometric key-provider interface
//! - Secure key-value storage abstraction
//! - HTTP transport abstraction with a reqwest-backed default

pub mod cipher;
pub mod crypto;
pub mod storage;
pub mod transport;
