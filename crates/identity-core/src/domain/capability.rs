//! External Capability Traits
//!
//! Interfaces the host must supply: social/SSO identity providers and the
//! platform passkey authenticator. Mirrors the repository-trait seam in
//! the persistence layer; implementations live outside this crate.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::session::Session;

/// How the credential presented by a flow should be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMode {
    /// Fresh sign-in
    #[default]
    Standard,
    /// Bind the new credential to an existing account
    Link,
    /// Re-authenticate an already signed-in account
    Reauth,
}

impl LoginMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LoginMode::Standard => "standard",
            LoginMode::Link => "link",
            LoginMode::Reauth => "reAuth",
        }
    }
}

/// Parameters handed to a provider sign-in
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    /// Standard, link or re-auth semantics
    pub login_mode: LoginMode,
    /// PKCE code challenge for SSO authorization requests
    pub pkce_challenge: Option<String>,
    /// Extra provider-specific parameters
    pub params: BTreeMap<String, String>,
}

/// What a provider sign-in produced
#[derive(Debug, Clone)]
pub enum ProviderGrant {
    /// Native social SDK produced a provider-session blob; the server is
    /// notified of it to mint a site session
    Native {
        /// Provider name (e.g. `facebook`, `google`)
        provider: String,
        /// Opaque provider-session JSON understood by the server
        session_blob: Value,
    },
    /// The provider round-trip already established a site session
    Established(Session),
    /// SSO/web flow returned an authorization code for PKCE exchange
    SsoCode {
        /// Authorization code
        code: String,
        /// Redirect URI the code was issued against
        redirect_uri: String,
    },
}

/// Provider capability failures
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider operation cancelled")]
    Cancelled,

    #[error("no host context available for provider flow")]
    HostUnavailable,

    #[error("{0}")]
    Failed(String),
}

/// External identity provider capability (social SDK or web SSO)
#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    /// Provider name used in wire parameters
    fn name(&self) -> &str;

    /// Run the provider's own sign-in and return what it produced
    async fn sign_in(&self, request: ProviderRequest) -> Result<ProviderGrant, ProviderError>;

    /// Tear down any provider-side session state
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Release provider-held host resources when the provider is
    /// discarded. Default does nothing.
    fn dispose(&self) {}
}

/// Platform passkey (FIDO2/WebAuthn) capability.
///
/// Both operations take and return the platform's JSON option/response
/// documents verbatim; `Ok(None)` means the user dismissed the prompt.
#[trait_variant::make(PasskeyAuthenticator: Send)]
pub trait LocalPasskeyAuthenticator {
    /// Create a credential from registration options
    async fn create_credential(&self, options: Value) -> Result<Option<Value>, ProviderError>;

    /// Produce an assertion from sign-in options
    async fn get_credential(&self, options: Value) -> Result<Option<Value>, ProviderError>;
}
