//! Login Flow
//!
//! Single-call credential login: non-error replies secure the issued
//! session, resolvable conditions interrupt.

use std::collections::BTreeMap;

use platform::transport::Transport;

use crate::application::support::FlowContext;
use crate::error::CoreResult;
use crate::outcome::AuthOutcome;
use crate::wire::request::ApiRequest;

/// Credential login input
#[derive(Debug, Clone)]
pub struct LoginParams {
    /// Login identifier (email or username)
    pub login_id: String,
    /// Plain password; travels only over the wire, never persisted
    pub password: String,
    /// Requested session lifetime in seconds; `None` leaves it to the
    /// site policy
    pub session_expiration: Option<i64>,
    /// Extra protocol parameters
    pub extra: BTreeMap<String, String>,
}

impl LoginParams {
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            password: password.into(),
            session_expiration: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Login use case
pub struct LoginFlow<T> {
    ctx: FlowContext<T>,
}

impl<T> LoginFlow<T>
where
    T: Transport + Sync,
{
    pub(crate) fn new(ctx: FlowContext<T>) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, params: LoginParams) -> AuthOutcome {
        AuthOutcome::from_result(self.run(params).await)
    }

    async fn run(&self, params: LoginParams) -> CoreResult<AuthOutcome> {
        let mut request = ApiRequest::new("accounts.login")
            .login_id(&params.login_id)
            .password(&params.password)
            .params(params.extra);
        if let Some(expiration) = params.session_expiration {
            request = request.param("sessionExpiration", expiration.to_string());
        }

        let response = self.ctx.call(&request).await?;
        let outcome = self.ctx.finish(response).await?;
        if outcome.is_success() {
            tracing::info!("credential login succeeded");
        }
        Ok(outcome)
    }
}
