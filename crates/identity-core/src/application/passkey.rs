//! Passkey Flow
//!
//! FIDO2 registration and sign-in: fetch options from the server, hand
//! them to the platform authenticator, return its JSON document, classify
//! the server's verdict. A dismissed platform prompt maps to the
//! operation-failed sentinel, never a panic.

use platform::transport::Transport;
use serde_json::Value;

use crate::application::support::FlowContext;
use crate::domain::capability::PasskeyAuthenticator;
use crate::error::{CoreError, CoreResult, codes};
use crate::outcome::{ApiError, AuthOutcome};
use crate::wire::request::ApiRequest;
use crate::wire::response::ApiResponse;

/// Passkey use case
pub struct PasskeyFlow<T> {
    ctx: FlowContext<T>,
}

impl<T> PasskeyFlow<T>
where
    T: Transport + Sync,
{
    pub(crate) fn new(ctx: FlowContext<T>) -> Self {
        Self { ctx }
    }

    /// Register a new passkey for the signed-in account
    pub async fn register<A>(&self, authenticator: &A) -> AuthOutcome
    where
        A: PasskeyAuthenticator + Sync,
    {
        AuthOutcome::from_result(self.run_register(authenticator).await)
    }

    /// Sign in with an existing passkey
    pub async fn sign_in<A>(&self, authenticator: &A) -> AuthOutcome
    where
        A: PasskeyAuthenticator + Sync,
    {
        AuthOutcome::from_result(self.run_sign_in(authenticator).await)
    }

    async fn run_register<A>(&self, authenticator: &A) -> CoreResult<AuthOutcome>
    where
        A: PasskeyAuthenticator + Sync,
    {
        let init = self
            .ctx
            .call(&ApiRequest::new("accounts.auth.fido.initRegisterCredentials"))
            .await?;
        let init = match self.ctx.checkpoint(init).await? {
            Ok(response) => response,
            Err(outcome) => return Ok(outcome),
        };
        let options = Self::options(&init)?;
        let token = init.string_field("token").unwrap_or_default();

        let Some(attestation) = authenticator.create_credential(options).await? else {
            return Ok(Self::dismissed());
        };

        let request = ApiRequest::new("accounts.auth.fido.registerCredentials")
            .param("attestation", attestation.to_string())
            .param("token", token);
        let response = self.ctx.call(&request).await?;
        let outcome = self.ctx.finish(response).await?;
        if outcome.is_success() {
            tracing::info!("passkey registered");
        }
        Ok(outcome)
    }

    async fn run_sign_in<A>(&self, authenticator: &A) -> CoreResult<AuthOutcome>
    where
        A: PasskeyAuthenticator + Sync,
    {
        let init = self
            .ctx
            .call(&ApiRequest::new("accounts.auth.fido.getAssertionOptions"))
            .await?;
        let init = match self.ctx.checkpoint(init).await? {
            Ok(response) => response,
            Err(outcome) => return Ok(outcome),
        };
        let options = Self::options(&init)?;
        let token = init.string_field("token").unwrap_or_default();

        let Some(assertion) = authenticator.get_credential(options).await? else {
            return Ok(Self::dismissed());
        };

        let request = ApiRequest::new("accounts.auth.fido.verifyAssertion")
            .param("authenticatorAssertion", assertion.to_string())
            .param("token", token);
        let response = self.ctx.call(&request).await?;
        let outcome = self.ctx.finish(response).await?;
        if outcome.is_success() {
            tracing::info!("passkey sign-in succeeded");
        }
        Ok(outcome)
    }

    fn options(response: &ApiResponse) -> CoreResult<Value> {
        response.field::<Value>("options").ok_or_else(|| {
            CoreError::Internal("fido reply carried no options document".to_string())
        })
    }

    fn dismissed() -> AuthOutcome {
        AuthOutcome::Error(ApiError::new(
            codes::OPERATION_FAILED,
            "passkey prompt dismissed",
        ))
    }
}
