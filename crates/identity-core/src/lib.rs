//! Identity Core - Authentication-Flow Engine and Session Security
//!
//! Clean Architecture structure:
//! - `domain/` - Session entities, resolvable contexts, capability traits
//! - `wire/` - Request building, signing, response parsing, classification
//! - `application/` - One use case per flow plus the service facade
//! - `infra/` - Transport-backed API service, encrypted session store
//!
//! ## Features
//! - Multi-step credential, social, passkey and SSO login protocols
//! - HMAC-SHA1 request signing over canonicalized parameters
//! - Resolvable-interruption handling (pending registration, identifier
//!   conflicts, one-time-code waypoints) via a tri-state outcome
//! - Encrypted session persistence with an optional biometric second
//!   encryption layer and scheduled expiration
//!
//! ## Security Model
//! - Sessions are sealed with ChaCha20-Poly1305 before touching storage
//! - Biometric records stay locked until a hardware-gated decrypt
//! - Session secrets are zeroized on drop and redacted from debug output
//! - Signed requests carry a single-use nonce and a stable-order base
//!   string both sides recompute

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod outcome;
pub mod wire;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::CoreConfig;
pub use application::service::IdentityService;
pub use application::{LoginParams, RegistrationParams, TwoFactorMode, TwoFactorVerify};
pub use domain::capability::{
    IdentityProvider, LoginMode, PasskeyAuthenticator, ProviderError, ProviderGrant,
    ProviderRequest,
};
pub use domain::resolvable::ResolvableContext;
pub use domain::session::{Session, SessionRecord, SessionSecurityLevel};
pub use error::{CoreError, CoreResult, codes};
pub use infra::session_store::{SessionEvent, SessionStore};
pub use outcome::{ApiError, AuthOutcome};
