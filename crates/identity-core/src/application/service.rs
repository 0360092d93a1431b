//! Identity Service
//!
//! The host-owned facade over the flow engine and session subsystem.
//! Explicitly constructed and dependency-injected; there is no ambient
//! global instance. Every flow entry point is one awaitable call
//! resolving to one [`AuthOutcome`].

use std::sync::Arc;

use platform::storage::SecureStorage;
use platform::transport::Transport;
use tokio::sync::broadcast;

use crate::application::captcha::CaptchaFlow;
use crate::application::config::CoreConfig;
use crate::application::link::LinkResolveFlow;
use crate::application::login::{LoginFlow, LoginParams};
use crate::application::passkey::PasskeyFlow;
use crate::application::provider::ProviderFlow;
use crate::application::register::{RegistrationFlow, RegistrationParams};
use crate::application::support::FlowContext;
use crate::application::two_factor::TwoFactorFlow;
use crate::domain::capability::{IdentityProvider, LoginMode, PasskeyAuthenticator};
use crate::domain::resolvable::ResolvableContext;
use crate::domain::session::{Session, SessionSecurityLevel};
use crate::error::CoreResult;
use crate::infra::api::ApiService;
use crate::infra::session_store::{SessionEvent, SessionStore};
use crate::outcome::AuthOutcome;
use crate::wire::request::ApiRequest;

/// Authentication and session core for one site identity
pub struct IdentityService<T> {
    ctx: FlowContext<T>,
}

impl<T> IdentityService<T>
where
    T: Transport + Sync,
{
    pub fn new(config: CoreConfig, transport: T, storage: Arc<dyn SecureStorage>) -> Self {
        let store = SessionStore::new(storage, &config.api_key);
        let api = Arc::new(ApiService::new(transport, Arc::new(config)));
        Self {
            ctx: FlowContext::new(api, store),
        }
    }

    // ------------------------------------------------------------------
    // Flow entry points
    // ------------------------------------------------------------------

    /// Credential login
    pub async fn login(&self, params: LoginParams) -> AuthOutcome {
        LoginFlow::new(self.ctx.clone()).execute(params).await
    }

    /// Credential registration
    pub async fn register(&self, params: RegistrationParams) -> AuthOutcome {
        RegistrationFlow::new(self.ctx.clone()).execute(params).await
    }

    /// Resume a registration interrupted on missing required fields
    pub async fn resume_registration(
        &self,
        reg_token: &str,
        fields: std::collections::BTreeMap<String, String>,
    ) -> AuthOutcome {
        RegistrationFlow::new(self.ctx.clone())
            .resume(reg_token, fields)
            .await
    }

    /// Social / SSO provider sign-in
    pub async fn sign_in_with_provider<P>(&self, provider: &P) -> AuthOutcome
    where
        P: IdentityProvider + Sync,
    {
        ProviderFlow::new(self.ctx.clone())
            .execute(provider, LoginMode::Standard)
            .await
    }

    /// Resolve an identifier conflict with site credentials
    pub async fn resolve_link_to_site(
        &self,
        context: &ResolvableContext,
        login_id: &str,
        password: &str,
    ) -> AuthOutcome {
        LinkResolveFlow::new(self.ctx.clone())
            .to_site(context, login_id, password)
            .await
    }

    /// Resolve an identifier conflict with a provider sign-in
    pub async fn resolve_link_to_provider<P>(
        &self,
        context: &ResolvableContext,
        provider: &P,
    ) -> AuthOutcome
    where
        P: IdentityProvider + Sync,
    {
        LinkResolveFlow::new(self.ctx.clone())
            .to_provider(context, provider)
            .await
    }

    /// Step API for two-factor continuations
    pub fn two_factor(&self) -> TwoFactorFlow<T> {
        TwoFactorFlow::new(self.ctx.clone())
    }

    /// Step API for captcha challenges
    pub fn captcha(&self) -> CaptchaFlow<T> {
        CaptchaFlow::new(self.ctx.clone())
    }

    /// Register a passkey for the signed-in account
    pub async fn register_passkey<A>(&self, authenticator: &A) -> AuthOutcome
    where
        A: PasskeyAuthenticator + Sync,
    {
        PasskeyFlow::new(self.ctx.clone()).register(authenticator).await
    }

    /// Sign in with an existing passkey
    pub async fn sign_in_with_passkey<A>(&self, authenticator: &A) -> AuthOutcome
    where
        A: PasskeyAuthenticator + Sync,
    {
        PasskeyFlow::new(self.ctx.clone()).sign_in(authenticator).await
    }

    /// Server-side logout, then local invalidation. Local state is
    /// cleared even when the server call fails.
    pub async fn logout(&self) -> AuthOutcome {
        let result = self.ctx.call(&ApiRequest::new("accounts.logout")).await;
        let cleared = self.ctx.store.clear_session(true).await;
        AuthOutcome::from_result(async {
            cleared?;
            let response = result?;
            tracing::info!("logged out");
            self.ctx.finish(response).await
        }
        .await)
    }

    // ------------------------------------------------------------------
    // Session inspection and biometric layering
    // ------------------------------------------------------------------

    /// Quick check whether any session record exists
    pub async fn available_session(&self) -> bool {
        self.ctx.store.available_session().await
    }

    /// Current decrypted session, if any
    pub async fn get_session(&self) -> Option<Session> {
        self.ctx.store.get_session().await
    }

    pub async fn session_security_level(&self) -> SessionSecurityLevel {
        self.ctx.store.security_level().await
    }

    pub async fn biometric_locked(&self) -> bool {
        self.ctx.store.biometric_locked().await
    }

    /// Layer biometric encryption atop the persisted session record
    pub async fn secure_biometric_session(&self, ciphertext: &[u8], iv: &[u8]) -> CoreResult<()> {
        self.ctx.store.secure_biometric_session(ciphertext, iv).await
    }

    /// Install the plaintext released by a successful biometric decrypt
    pub async fn unlock_biometric_session(&self, plaintext: &[u8]) -> CoreResult<()> {
        self.ctx.store.unlock_biometric_session(plaintext).await
    }

    /// Strip the biometric layer and fall back to standard encryption
    pub async fn opt_out_biometric_session(&self, plaintext: &[u8]) -> CoreResult<()> {
        self.ctx.store.opt_out_biometric_session(plaintext).await
    }

    /// Subscribe to session lifecycle events (expiry)
    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.ctx.store.subscribe()
    }
}
