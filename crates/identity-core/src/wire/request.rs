//! Request Builder
//!
//! Accumulates caller parameters over a generic string-map core and, at
//! build time, applies the fixed envelope and (when a valid session
//! exists) the `oauth_token` + `sig` signing pair.

use std::collections::BTreeMap;

use platform::crypto;
use platform::transport::HttpMethod;

use crate::application::config::{CoreConfig, SDK_VERSION_TAG};
use crate::domain::capability::LoginMode;
use crate::domain::session::Session;
use crate::error::CoreResult;
use crate::wire::signer::{self, SIG_PARAM, SigningSpec};

/// One outgoing API call under construction
#[derive(Debug, Clone)]
pub struct ApiRequest {
    endpoint: String,
    method: HttpMethod,
    params: BTreeMap<String, String>,
}

impl ApiRequest {
    /// POST request (the default for every mutating protocol call)
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: HttpMethod::Post,
            params: BTreeMap::new(),
        }
    }

    /// GET request (query-string parameters)
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            ..Self::new(endpoint)
        }
    }

    /// Add one parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add many parameters
    pub fn params<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.params.insert(key.into(), value.into());
        }
        self
    }

    // Named helpers for the common credential parameters

    pub fn login_id(self, login_id: &str) -> Self {
        self.param("loginID", login_id)
    }

    pub fn password(self, password: &str) -> Self {
        self.param("password", password)
    }

    pub fn reg_token(self, reg_token: &str) -> Self {
        self.param("regToken", reg_token)
    }

    pub fn login_mode(self, mode: LoginMode) -> Self {
        self.param("loginMode", mode.as_str())
    }

    pub fn provider(self, provider: &str) -> Self {
        self.param("provider", provider)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Produce the final sorted parameter map.
    ///
    /// Envelope invariants:
    /// - requests are always mobile-targeted; a caller-supplied
    ///   `targetEnv` is dropped
    /// - a fresh single-use nonce per build
    /// - `oauth_token` + `sig` only when a valid session is supplied
    pub fn build(
        &self,
        config: &CoreConfig,
        session: Option<&Session>,
    ) -> CoreResult<BTreeMap<String, String>> {
        let mut params = self.params.clone();
        params.remove(SIG_PARAM);

        params.insert("apiKey".to_string(), config.api_key.clone());
        params.insert("sdk".to_string(), SDK_VERSION_TAG.to_string());
        params.insert("targetEnv".to_string(), "mobile".to_string());
        params.insert("format".to_string(), "json".to_string());
        params.insert("nonce".to_string(), crypto::nonce());

        if let Some(session) = session.filter(|s| s.is_valid()) {
            params.insert("oauth_token".to_string(), session.token.clone());
            let endpoint_url = config.endpoint_url(&self.endpoint)?;
            let sig = signer::sign(&SigningSpec {
                secret: session.secret.expose(),
                method: self.method,
                endpoint: &endpoint_url,
                params: &params,
            })?;
            params.insert(SIG_PARAM.to_string(), sig);
        }

        Ok(params)
    }
}
