//! Captcha Flow
//!
//! Fixed short sequence guarding abuse-prone operations: a challenge is
//! fetched, the host renders it and collects the user's answer, and
//! verification trades the answer for an assertion the caller attaches
//! to the guarded call. Every step classifies its reply; any non-success
//! short-circuits the remainder.

use platform::transport::Transport;

use crate::application::support::FlowContext;
use crate::error::CoreResult;
use crate::outcome::AuthOutcome;
use crate::wire::request::ApiRequest;

/// Captcha use case; each step is its own awaitable call so the host can
/// render the challenge between them
pub struct CaptchaFlow<T> {
    ctx: FlowContext<T>,
}

impl<T> CaptchaFlow<T>
where
    T: Transport + Sync,
{
    pub(crate) fn new(ctx: FlowContext<T>) -> Self {
        Self { ctx }
    }

    /// Fetch a fresh challenge. Success payload carries the
    /// `captchaToken` and the challenge media for the host to render.
    pub async fn init(&self) -> AuthOutcome {
        AuthOutcome::from_result(
            self.step(ApiRequest::new("accounts.captcha.getChallenge"))
                .await,
        )
    }

    /// Verify the user's answer against the issued challenge. Success
    /// payload carries the `captchaAssertion` the caller attaches to the
    /// guarded call.
    pub async fn verify(&self, captcha_token: &str, text: &str) -> AuthOutcome {
        let request = ApiRequest::new("accounts.captcha.verify")
            .param("captchaToken", captcha_token)
            .param("captchaText", text);
        AuthOutcome::from_result(self.step(request).await)
    }

    /// One step: classify and stop on anything non-success
    async fn step(&self, request: ApiRequest) -> CoreResult<AuthOutcome> {
        let response = self.ctx.call(&request).await?;
        match self.ctx.checkpoint(response).await? {
            Ok(response) => Ok(AuthOutcome::Success(response.into_payload())),
            Err(outcome) => Ok(outcome),
        }
    }
}
