//! Registration Flow
//!
//! Two-call protocol: `initRegistration` obtains the regToken that
//! correlates the sequence, `register` submits the caller's fields.
//! Pending-registration and verification waypoints interrupt; success
//! secures the issued session.

use std::collections::BTreeMap;

use platform::transport::Transport;
use serde_json::Value;

use crate::application::support::FlowContext;
use crate::error::{CoreError, CoreResult};
use crate::outcome::AuthOutcome;
use crate::wire::request::ApiRequest;

/// Registration input
#[derive(Debug, Clone)]
pub struct RegistrationParams {
    pub login_id: String,
    pub password: String,
    /// Profile document submitted alongside the credentials
    pub profile: Option<Value>,
    /// Ask the server to finalize in the same call (the default)
    pub finalize: bool,
    /// Extra protocol parameters (schema fields, subscriptions, ...)
    pub extra: BTreeMap<String, String>,
}

impl RegistrationParams {
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            password: password.into(),
            profile: None,
            finalize: true,
            extra: BTreeMap::new(),
        }
    }
}

/// Registration use case
pub struct RegistrationFlow<T> {
    ctx: FlowContext<T>,
}

impl<T> RegistrationFlow<T>
where
    T: Transport + Sync,
{
    pub(crate) fn new(ctx: FlowContext<T>) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, params: RegistrationParams) -> AuthOutcome {
        AuthOutcome::from_result(self.run(params).await)
    }

    /// Resume an interrupted registration with the previously issued
    /// regToken and the newly supplied fields.
    pub async fn resume(
        &self,
        reg_token: &str,
        fields: BTreeMap<String, String>,
    ) -> AuthOutcome {
        let request = ApiRequest::new("accounts.register")
            .reg_token(reg_token)
            .param("finalizeRegistration", "true")
            .params(fields);
        AuthOutcome::from_result(self.submit(request).await)
    }

    async fn run(&self, params: RegistrationParams) -> CoreResult<AuthOutcome> {
        let init = self
            .ctx
            .call(&ApiRequest::new("accounts.initRegistration"))
            .await?;
        let init = match self.ctx.checkpoint(init).await? {
            Ok(response) => response,
            Err(outcome) => return Ok(outcome),
        };
        let reg_token = init.string_field("regToken").ok_or_else(|| {
            CoreError::Internal("initRegistration reply carried no regToken".to_string())
        })?;

        let mut request = ApiRequest::new("accounts.register")
            .login_id(&params.login_id)
            .password(&params.password)
            .reg_token(&reg_token)
            .param("finalizeRegistration", params.finalize.to_string())
            .params(params.extra);
        if let Some(profile) = &params.profile {
            request = request.param("profile", profile.to_string());
        }

        self.submit(request).await
    }

    async fn submit(&self, request: ApiRequest) -> CoreResult<AuthOutcome> {
        let response = self.ctx.call(&request).await?;
        let outcome = self.ctx.finish(response).await?;
        if outcome.is_success() {
            tracing::info!("registration completed");
        }
        Ok(outcome)
    }
}
