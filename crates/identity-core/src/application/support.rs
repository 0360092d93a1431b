//! Shared flow plumbing
//!
//! Every flow drives its round trips through [`FlowContext`]: signed
//! execution against the current session, the classify-then-secure
//! convergence step, and the conflict follow-up fetch. The context never
//! holds the session lock across a network call.

use std::sync::Arc;

use platform::transport::Transport;

use crate::domain::resolvable::ResolvableContext;
use crate::error::CoreResult;
use crate::infra::api::ApiService;
use crate::infra::session_store::SessionStore;
use crate::outcome::AuthOutcome;
use crate::wire::classify::{Disposition, classify};
use crate::wire::request::ApiRequest;
use crate::wire::response::ApiResponse;

pub(crate) struct FlowContext<T> {
    pub api: Arc<ApiService<T>>,
    pub store: SessionStore,
}

impl<T> Clone for FlowContext<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            store: self.store.clone(),
        }
    }
}

impl<T> FlowContext<T>
where
    T: Transport + Sync,
{
    pub fn new(api: Arc<ApiService<T>>, store: SessionStore) -> Self {
        Self { api, store }
    }

    /// Execute one call, signed when a session is currently available
    pub async fn call(&self, request: &ApiRequest) -> CoreResult<ApiResponse> {
        let session = self.store.get_session().await;
        self.api.execute(request, session.as_ref()).await
    }

    /// Terminal convergence for a flow: classify, and on success persist
    /// any session the reply carries.
    pub async fn finish(&self, response: ApiResponse) -> CoreResult<AuthOutcome> {
        match classify(&response) {
            Disposition::Success => {
                if let Some(session) = response.session() {
                    self.store.set_session(session).await?;
                }
                Ok(AuthOutcome::Success(response.into_payload()))
            }
            Disposition::Error(error) => Ok(AuthOutcome::Error(error)),
            Disposition::Resolvable(context) => {
                Ok(AuthOutcome::Interrupted(self.enrich(context).await?))
            }
        }
    }

    /// Mid-sequence waypoint: `Ok` to continue, `Err(outcome)` to
    /// short-circuit the remainder of the sequence.
    pub async fn checkpoint(
        &self,
        response: ApiResponse,
    ) -> CoreResult<Result<ApiResponse, AuthOutcome>> {
        match classify(&response) {
            Disposition::Success => Ok(Ok(response)),
            Disposition::Error(error) => Ok(Err(AuthOutcome::Error(error))),
            Disposition::Resolvable(context) => {
                Ok(Err(AuthOutcome::Interrupted(self.enrich(context).await?)))
            }
        }
    }

    /// Conflict contexts are a stub until the follow-up fetch fills in
    /// the already-linked login methods.
    async fn enrich(&self, context: ResolvableContext) -> CoreResult<ResolvableContext> {
        let ResolvableContext::ConflictingAccounts {
            reg_token,
            provider,
            ..
        } = context
        else {
            return Ok(context);
        };

        // The interruption survives a failed fetch; the caller just gets
        // less to show.
        let request = ApiRequest::new("accounts.getConflictingAccount").reg_token(&reg_token);
        let fetched = match self.call(&request).await {
            Ok(response) if !response.is_error() => Some(response),
            Ok(response) => {
                tracing::warn!(
                    code = response.error_code(),
                    "conflicting-account fetch refused, surfacing bare context"
                );
                None
            }
            Err(error) => {
                error.log();
                None
            }
        };
        let Some(response) = fetched else {
            return Ok(ResolvableContext::ConflictingAccounts {
                reg_token,
                provider,
                auth_token: None,
                login_providers: Vec::new(),
            });
        };

        Ok(ResolvableContext::ConflictingAccounts {
            reg_token,
            provider,
            auth_token: response.string_field("conflictingAccount.authToken"),
            login_providers: response
                .field::<Vec<String>>("conflictingAccount.loginProviders")
                .unwrap_or_default(),
        })
    }
}
