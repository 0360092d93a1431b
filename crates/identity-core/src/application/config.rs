//! Application Configuration

use url::Url;

use crate::error::{CoreError, CoreResult};

/// SDK identifier sent in the request envelope
pub const SDK_VERSION_TAG: &str = concat!("rust_", env!("CARGO_PKG_VERSION"));

/// Core configuration for one site identity
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Site API key (client key in the request envelope)
    pub api_key: String,
    /// Data-center API domain, e.g. `us1.api.example.com`
    pub api_domain: String,
}

impl CoreConfig {
    pub fn new(api_key: impl Into<String>, api_domain: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_domain: api_domain.into(),
        }
    }

    /// Canonical URL for a dotted endpoint name.
    ///
    /// The namespace is the endpoint's first dot-segment:
    /// `accounts.login` -> `https://accounts.{api_domain}/accounts.login`.
    pub fn endpoint_url(&self, endpoint: &str) -> CoreResult<String> {
        let namespace = endpoint
            .split('.')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| CoreError::Internal(format!("invalid endpoint name: {endpoint:?}")))?;
        let url = Url::parse(&format!(
            "https://{namespace}.{domain}/{endpoint}",
            domain = self.api_domain
        ))?;
        Ok(url.to_string())
    }

    /// Token endpoint for the SSO/PKCE code exchange
    pub fn sso_token_url(&self) -> CoreResult<String> {
        let url = Url::parse(&format!(
            "https://fidm.{domain}/oauth/token",
            domain = self.api_domain
        ))?;
        Ok(url.to_string())
    }
}
