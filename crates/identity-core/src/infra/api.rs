//! API Service
//!
//! Executes wire requests over the injected [`Transport`]: builds the
//! final parameter map (envelope + optional signing), resolves the
//! endpoint URL, sends, and parses the reply. Transport failures are
//! propagated as [`CoreError::Transport`] and collapse into the fixed
//! network sentinel at the flow boundary; the HTTP status of a delivered
//! reply is never consulted.

use std::collections::BTreeMap;
use std::sync::Arc;

use platform::transport::{HttpMethod, Transport};

use crate::application::config::CoreConfig;
use crate::domain::session::Session;
use crate::error::CoreResult;
use crate::wire::request::ApiRequest;
use crate::wire::response::ApiResponse;

/// Transport-backed request executor
pub struct ApiService<T> {
    transport: T,
    config: Arc<CoreConfig>,
}

impl<T> ApiService<T>
where
    T: Transport + Sync,
{
    pub fn new(transport: T, config: Arc<CoreConfig>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Execute a protocol call, signing it when a valid session is given
    pub async fn execute(
        &self,
        request: &ApiRequest,
        session: Option<&Session>,
    ) -> CoreResult<ApiResponse> {
        let url = self.config.endpoint_url(request.endpoint())?;
        let params = request.build(&self.config, session)?;

        let reply = self
            .transport
            .send(request.method(), &url, &[], &params)
            .await?;
        let response = ApiResponse::from_bytes(&reply.body)?;

        tracing::debug!(
            endpoint = request.endpoint(),
            call_id = response.call_id().unwrap_or(""),
            error_code = response.error_code(),
            "api call completed"
        );

        Ok(response)
    }

    /// Execute a raw call against an absolute URL with caller-assembled
    /// parameters (no envelope, no signing). Used for the SSO token
    /// exchange, which speaks plain OAuth rather than the API envelope.
    pub async fn execute_url(
        &self,
        method: HttpMethod,
        url: &str,
        params: &BTreeMap<String, String>,
    ) -> CoreResult<ApiResponse> {
        let reply = self.transport.send(method, url, &[], params).await?;
        let response = ApiResponse::from_bytes(&reply.body)?;
        tracing::debug!(url, error_code = response.error_code(), "raw call completed");
        Ok(response)
    }
}
