//! Link-Account Resolution Flow
//!
//! Continues a flow interrupted by an identifier conflict: the caller
//! re-authenticates with site credentials or a provider (both with
//! `loginMode=link`), and on success a final connect call binds the new
//! credential to the existing account.
//!
//! Known gap: cancellation between the re-login and the connect call can
//! leave the account half-linked; the protocol defines no compensating
//! transaction.

use std::collections::BTreeMap;

use platform::transport::Transport;

use crate::application::provider::ProviderFlow;
use crate::application::support::FlowContext;
use crate::domain::capability::{IdentityProvider, LoginMode};
use crate::domain::resolvable::ResolvableContext;
use crate::error::{CoreError, CoreResult};
use crate::outcome::AuthOutcome;
use crate::wire::request::ApiRequest;

/// Link resolution use case
pub struct LinkResolveFlow<T> {
    ctx: FlowContext<T>,
}

impl<T> LinkResolveFlow<T>
where
    T: Transport + Sync,
{
    pub(crate) fn new(ctx: FlowContext<T>) -> Self {
        Self { ctx }
    }

    /// Resolve by re-authenticating with site credentials
    pub async fn to_site(
        &self,
        context: &ResolvableContext,
        login_id: &str,
        password: &str,
    ) -> AuthOutcome {
        AuthOutcome::from_result(self.run_site(context, login_id, password).await)
    }

    /// Resolve by re-running a provider sign-in in link mode
    pub async fn to_provider<P>(&self, context: &ResolvableContext, provider: &P) -> AuthOutcome
    where
        P: IdentityProvider + Sync,
    {
        AuthOutcome::from_result(self.run_provider(context, provider).await)
    }

    async fn run_site(
        &self,
        context: &ResolvableContext,
        login_id: &str,
        password: &str,
    ) -> CoreResult<AuthOutcome> {
        let (reg_token, provider) = Self::conflict(context)?;

        let request = ApiRequest::new("accounts.login")
            .login_id(login_id)
            .password(password)
            .login_mode(LoginMode::Link)
            .reg_token(reg_token);
        let response = self.ctx.call(&request).await?;
        let response = match self.ctx.checkpoint(response).await? {
            Ok(response) => response,
            Err(outcome) => return Ok(outcome),
        };
        if let Some(session) = response.session() {
            self.ctx.store.set_session(session).await?;
        }

        self.connect(reg_token, provider).await
    }

    async fn run_provider<P>(
        &self,
        context: &ResolvableContext,
        provider: &P,
    ) -> CoreResult<AuthOutcome>
    where
        P: IdentityProvider + Sync,
    {
        let (reg_token, _) = Self::conflict(context)?;

        let mut extra = BTreeMap::new();
        extra.insert("regToken".to_string(), reg_token.to_string());
        let outcome = ProviderFlow::new(self.ctx.clone())
            .run(provider, LoginMode::Link, extra)
            .await?;
        if !outcome.is_success() {
            return Ok(outcome);
        }

        self.connect(reg_token, Some(provider.name())).await
    }

    /// Final binding call after a successful link re-authentication
    async fn connect(&self, reg_token: &str, provider: Option<&str>) -> CoreResult<AuthOutcome> {
        let mut request = ApiRequest::new("socialize.addConnection").reg_token(reg_token);
        if let Some(provider) = provider {
            request = request.provider(provider);
        }
        let response = self.ctx.call(&request).await?;
        let outcome = self.ctx.finish(response).await?;
        if outcome.is_success() {
            tracing::info!(provider = provider.unwrap_or("site"), "account link resolved");
        }
        Ok(outcome)
    }

    fn conflict(context: &ResolvableContext) -> CoreResult<(&str, Option<&str>)> {
        match context {
            ResolvableContext::ConflictingAccounts {
                reg_token,
                provider,
                ..
            } => Ok((reg_token, provider.as_deref())),
            _ => Err(CoreError::Internal(
                "link resolution requires a conflicting-accounts context".to_string(),
            )),
        }
    }
}
