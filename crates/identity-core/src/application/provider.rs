//! Provider Sign-In Flow
//!
//! Delegates to the external [`IdentityProvider`] capability and converges
//! whatever it produced onto the same three-way classification:
//! - a native social blob is forwarded via `socialize.notifySocialLogin`
//! - a pre-established session is persisted, then account info refreshed
//! - an SSO authorization code is exchanged at the token endpoint (PKCE)
//!   before persisting and refreshing

use std::collections::BTreeMap;

use platform::crypto::PkcePair;
use platform::transport::{HttpMethod, Transport};

use crate::application::support::FlowContext;
use crate::domain::capability::{
    IdentityProvider, LoginMode, ProviderGrant, ProviderRequest,
};
use crate::domain::resolvable::ResolvableContext;
use crate::domain::session::Session;
use crate::error::{CoreResult, codes};
use crate::outcome::{ApiError, AuthOutcome};
use crate::wire::request::ApiRequest;

/// Provider sign-in use case
pub struct ProviderFlow<T> {
    ctx: FlowContext<T>,
}

impl<T> ProviderFlow<T>
where
    T: Transport + Sync,
{
    pub(crate) fn new(ctx: FlowContext<T>) -> Self {
        Self { ctx }
    }

    pub async fn execute<P>(&self, provider: &P, mode: LoginMode) -> AuthOutcome
    where
        P: IdentityProvider + Sync,
    {
        AuthOutcome::from_result(self.run(provider, mode, BTreeMap::new()).await)
    }

    pub(crate) async fn run<P>(
        &self,
        provider: &P,
        mode: LoginMode,
        extra: BTreeMap<String, String>,
    ) -> CoreResult<AuthOutcome>
    where
        P: IdentityProvider + Sync,
    {
        let pkce = PkcePair::generate();
        let grant = provider
            .sign_in(ProviderRequest {
                login_mode: mode,
                pkce_challenge: Some(pkce.challenge.clone()),
                params: extra.clone(),
            })
            .await?;

        let outcome = match grant {
            ProviderGrant::Native {
                provider: name,
                session_blob,
            } => {
                tracing::debug!(provider = %name, "notifying native social login");
                let request = ApiRequest::new("socialize.notifySocialLogin")
                    .provider(&name)
                    .param("providerSessions", session_blob.to_string())
                    .login_mode(mode)
                    .params(extra);
                let response = self.ctx.call(&request).await?;
                self.ctx.finish(response).await?
            }
            ProviderGrant::Established(session) => {
                tracing::debug!(provider = provider.name(), "provider established session");
                self.ctx.store.set_session(session).await?;
                self.refresh_account().await?
            }
            ProviderGrant::SsoCode { code, redirect_uri } => {
                match self.exchange_code(&code, &redirect_uri, &pkce).await? {
                    Some(session) => {
                        self.ctx.store.set_session(session).await?;
                        self.refresh_account().await?
                    }
                    None => AuthOutcome::Error(
                        ApiError::new(codes::OPERATION_FAILED, "sso code exchange failed"),
                    ),
                }
            }
        };

        // Conflicts surfaced here are attributed to the provider that
        // triggered them so link resolution can name it.
        Ok(match outcome {
            AuthOutcome::Interrupted(ResolvableContext::ConflictingAccounts {
                reg_token,
                auth_token,
                login_providers,
                ..
            }) => AuthOutcome::Interrupted(ResolvableContext::ConflictingAccounts {
                reg_token,
                provider: Some(provider.name().to_string()),
                auth_token,
                login_providers,
            }),
            other => other,
        })
    }

    /// PKCE code exchange at the token endpoint. The reply is plain
    /// OAuth, not the API envelope.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        pkce: &PkcePair,
    ) -> CoreResult<Option<Session>> {
        let url = self.ctx.api.config().sso_token_url()?;
        let mut params = BTreeMap::new();
        params.insert("grant_type".to_string(), "authorization_code".to_string());
        params.insert("code".to_string(), code.to_string());
        params.insert("redirect_uri".to_string(), redirect_uri.to_string());
        params.insert(
            "client_id".to_string(),
            self.ctx.api.config().api_key.clone(),
        );
        params.insert("code_verifier".to_string(), pkce.verifier.clone());

        let response = self
            .ctx
            .api
            .execute_url(HttpMethod::Post, &url, &params)
            .await?;

        let token = response.string_field("access_token");
        let secret = response.string_field("session_secret");
        match (token, secret) {
            (Some(token), Some(secret)) => {
                let expiration = response.field::<i64>("expires_in").unwrap_or(0);
                Ok(Some(Session::new(token, secret, expiration)))
            }
            _ => {
                tracing::warn!(
                    error = response.string_field("error").as_deref().unwrap_or("unknown"),
                    "token endpoint refused the authorization code"
                );
                Ok(None)
            }
        }
    }

    /// Post-persist account refresh shared by the established-session and
    /// SSO arms
    async fn refresh_account(&self) -> CoreResult<AuthOutcome> {
        let response = self
            .ctx
            .call(&ApiRequest::new("accounts.getAccountInfo"))
            .await?;
        self.ctx.finish(response).await
    }
}
