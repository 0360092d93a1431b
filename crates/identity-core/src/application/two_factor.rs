//! Two-Factor Authentication Flow
//!
//! Fixed short sequence continuing an interrupted login/registration:
//! init issues a TFA assertion, the provider callback delivers a code to
//! the user, verification trades the code for a provider assertion and
//! finalizes. Every step classifies its reply; any non-success
//! short-circuits the remainder.

use platform::transport::Transport;

use crate::application::support::FlowContext;
use crate::error::{CoreError, CoreResult};
use crate::outcome::AuthOutcome;
use crate::wire::request::ApiRequest;

/// Whether the factor is being enrolled or an enrolled factor is being
/// challenged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorMode {
    /// First enrollment of the factor
    Register,
    /// Challenge against an already-enrolled factor
    Verify,
}

impl TwoFactorMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TwoFactorMode::Register => "register",
            TwoFactorMode::Verify => "verify",
        }
    }
}

/// Input for the verification step
#[derive(Debug, Clone)]
pub struct TwoFactorVerify {
    /// Assertion issued by the init step
    pub tfa_assertion: String,
    /// Token issued by the provider callback (code delivery)
    pub delivery_token: String,
    /// Code the user received
    pub code: String,
    /// regToken of the interrupted flow being continued
    pub reg_token: String,
}

/// Two-factor use case; each step is its own awaitable call so the host
/// can drive UI between them
pub struct TwoFactorFlow<T> {
    ctx: FlowContext<T>,
}

impl<T> TwoFactorFlow<T>
where
    T: Transport + Sync,
{
    pub(crate) fn new(ctx: FlowContext<T>) -> Self {
        Self { ctx }
    }

    /// Start TFA for the interrupted flow. Success payload carries the
    /// `tfaAssertion` for the following steps.
    pub async fn init(&self, reg_token: &str, provider: &str, mode: TwoFactorMode) -> AuthOutcome {
        let request = ApiRequest::new("accounts.tfa.initTFA")
            .reg_token(reg_token)
            .provider(provider)
            .param("mode", mode.as_str());
        AuthOutcome::from_result(self.step(request).await)
    }

    /// Provider callback: deliver a one-time code to the given phone.
    /// Success payload carries the `deliveryToken` consumed by
    /// [`TwoFactorFlow::verify`].
    pub async fn send_code(
        &self,
        tfa_assertion: &str,
        phone: &str,
        method: &str,
        lang: &str,
    ) -> AuthOutcome {
        let request = ApiRequest::new("accounts.tfa.phone.sendVerificationCode")
            .param("tfaAssertion", tfa_assertion)
            .param("phone", phone)
            .param("method", method)
            .param("lang", lang);
        AuthOutcome::from_result(self.step(request).await)
    }

    /// Verify the received code, finalize TFA, and finalize the
    /// interrupted flow (securing the issued session).
    pub async fn verify(&self, input: TwoFactorVerify) -> AuthOutcome {
        AuthOutcome::from_result(self.run_verify(input).await)
    }

    async fn run_verify(&self, input: TwoFactorVerify) -> CoreResult<AuthOutcome> {
        let complete = ApiRequest::new("accounts.tfa.phone.completeVerification")
            .param("tfaAssertion", &input.tfa_assertion)
            .param("deliveryToken", &input.delivery_token)
            .param("code", &input.code);
        let response = self.ctx.call(&complete).await?;
        let response = match self.ctx.checkpoint(response).await? {
            Ok(response) => response,
            Err(outcome) => return Ok(outcome),
        };
        let provider_assertion = response.string_field("providerAssertion").ok_or_else(|| {
            CoreError::Internal("completeVerification reply carried no providerAssertion".to_string())
        })?;

        let finalize = ApiRequest::new("accounts.tfa.finalizeTFA")
            .param("tfaAssertion", &input.tfa_assertion)
            .param("providerAssertion", &provider_assertion)
            .reg_token(&input.reg_token);
        let response = self.ctx.call(&finalize).await?;
        if let Err(outcome) = self.ctx.checkpoint(response).await? {
            return Ok(outcome);
        }

        // Finalizing TFA re-arms the original flow; finishing it mints
        // the session.
        let resume = ApiRequest::new("accounts.finalizeRegistration").reg_token(&input.reg_token);
        let response = self.ctx.call(&resume).await?;
        let outcome = self.ctx.finish(response).await?;
        if outcome.is_success() {
            tracing::info!("two-factor verification completed");
        }
        Ok(outcome)
    }

    /// One mid-sequence step: classify and stop on anything non-success
    async fn step(&self, request: ApiRequest) -> CoreResult<AuthOutcome> {
        let response = self.ctx.call(&request).await?;
        match self.ctx.checkpoint(response).await? {
            Ok(response) => Ok(AuthOutcome::Success(response.into_payload())),
            Err(outcome) => Ok(outcome),
        }
    }
}
