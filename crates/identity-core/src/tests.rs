//! Flow scenario tests
//!
//! End-to-end exercises of the flow engine against a scripted transport:
//! every network reply is queued up front, and the recorded calls are
//! asserted afterwards.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use platform::storage::MemoryStorage;
use platform::transport::{HttpMethod, Transport, TransportError, TransportReply};

use crate::application::config::CoreConfig;
use crate::application::login::LoginParams;
use crate::application::register::RegistrationParams;
use crate::application::service::IdentityService;
use crate::domain::capability::{
    IdentityProvider, PasskeyAuthenticator, ProviderError, ProviderGrant, ProviderRequest,
};
use crate::domain::resolvable::ResolvableContext;
use crate::domain::session::Session;
use crate::error::codes;
use crate::outcome::AuthOutcome;

#[derive(Debug, Clone)]
struct RecordedCall {
    url: String,
    params: BTreeMap<String, String>,
}

#[derive(Default)]
struct MockInner {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// Scripted transport: pops one queued reply per call
#[derive(Clone, Default)]
struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn push(&self, reply: Value) {
        self.inner.replies.lock().unwrap().push_back(Ok(reply));
    }

    fn push_failure(&self, error: TransportError) {
        self.inner.replies.lock().unwrap().push_back(Err(error));
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn send(
        &self,
        _method: HttpMethod,
        url: &str,
        _headers: &[(String, String)],
        params: &BTreeMap<String, String>,
    ) -> Result<TransportReply, TransportError> {
        self.inner.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            params: params.clone(),
        });
        let next = self
            .inner
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("flow made more calls than the script allows");
        next.map(|value| TransportReply {
            status: 200,
            body: value.to_string().into_bytes(),
        })
    }
}

fn service(transport: &MockTransport) -> IdentityService<MockTransport> {
    IdentityService::new(
        CoreConfig::new("site-key", "us1.api.example.com"),
        transport.clone(),
        Arc::new(MemoryStorage::new()),
    )
}

fn session_reply(token: &str, secret: &str, expires_in: i64) -> Value {
    json!({
        "callId": "call-1",
        "errorCode": 0,
        "sessionInfo": {
            "sessionToken": token,
            "sessionSecret": secret,
            "expires_in": expires_in,
        },
    })
}

// Base64 of "secret"; signed follow-up calls need a decodable secret
const SECRET_B64: &str = "c2VjcmV0";

mod login {
    use super::*;

    #[tokio::test]
    async fn valid_credentials_single_call_success() {
        let transport = MockTransport::new();
        transport.push(session_reply("T", "S", 3600));
        let service = service(&transport);

        let outcome = service.login(LoginParams::new("ada@example.com", "pw")).await;
        assert!(outcome.is_success());

        let session = service.get_session().await.unwrap();
        assert_eq!(session, Session::new("T", "S", 3600));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].url.ends_with("/accounts.login"));
        assert_eq!(calls[0].params["loginID"], "ada@example.com");
    }

    #[tokio::test]
    async fn envelope_present_and_unsigned_without_session() {
        let transport = MockTransport::new();
        transport.push(session_reply("T", "S", 0));
        service(&transport)
            .login(LoginParams::new("u", "p"))
            .await;

        let call = &transport.calls()[0];
        assert_eq!(call.params["apiKey"], "site-key");
        assert_eq!(call.params["targetEnv"], "mobile");
        assert_eq!(call.params["format"], "json");
        assert!(call.params.contains_key("nonce"));
        assert!(!call.params.contains_key("oauth_token"));
        assert!(!call.params.contains_key("sig"));
    }

    #[tokio::test]
    async fn protocol_error_maps_to_error_outcome() {
        let transport = MockTransport::new();
        transport.push(json!({
            "errorCode": 403042,
            "errorMessage": "Invalid LoginID",
        }));
        let outcome = service(&transport)
            .login(LoginParams::new("u", "bad"))
            .await;
        match outcome {
            AuthOutcome::Error(error) => {
                assert_eq!(error.code, 403042);
                assert_eq!(error.message, "Invalid LoginID");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn otp_waypoint_interrupts_on_success_code() {
        let transport = MockTransport::new();
        transport.push(json!({
            "errorCode": 0,
            "regToken": "rt",
            "vToken": "vt",
        }));
        let service = service(&transport);
        let outcome = service.login(LoginParams::new("u", "p")).await;
        assert_eq!(
            outcome.context(),
            Some(&ResolvableContext::PendingVerification {
                reg_token: "rt".to_string(),
                verification_token: Some("vt".to_string()),
            })
        );
        // No session is secured on an interrupted login
        assert!(service.get_session().await.is_none());
    }

    #[tokio::test]
    async fn no_connectivity_yields_network_sentinel() {
        let transport = MockTransport::new();
        transport.push_failure(TransportError::NotConnected);
        let outcome = service(&transport).login(LoginParams::new("u", "p")).await;
        match outcome {
            AuthOutcome::Error(error) => assert_eq!(error.code, codes::NETWORK_ERROR),
            other => panic!("expected error, got {other:?}"),
        }
    }
}

mod registration {
    use super::*;

    #[tokio::test]
    async fn pending_registration_interrupts_with_missing_fields() {
        let transport = MockTransport::new();
        transport.push(json!({"errorCode": 0, "regToken": "rt"}));
        transport.push(json!({
            "errorCode": 206001,
            "regToken": "rt",
            "errorDetails": "firstName,lastName",
        }));
        let service = service(&transport);

        let outcome = service
            .register(RegistrationParams::new("ada@example.com", "pw"))
            .await;
        assert_eq!(
            outcome.context(),
            Some(&ResolvableContext::PendingRegistration {
                reg_token: "rt".to_string(),
                missing_required_fields: vec![
                    "firstName".to_string(),
                    "lastName".to_string()
                ],
            })
        );

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].url.ends_with("/accounts.initRegistration"));
        assert_eq!(calls[1].params["regToken"], "rt");
        assert!(service.get_session().await.is_none());
    }

    #[tokio::test]
    async fn successful_registration_secures_session() {
        let transport = MockTransport::new();
        transport.push(json!({"errorCode": 0, "regToken": "rt"}));
        transport.push(session_reply("T", SECRET_B64, 0));
        let service = service(&transport);

        let outcome = service
            .register(RegistrationParams::new("ada@example.com", "pw"))
            .await;
        assert!(outcome.is_success());
        assert!(service.get_session().await.is_some());
        assert_eq!(
            transport.calls()[1].params["finalizeRegistration"],
            "true"
        );
    }

    #[tokio::test]
    async fn resume_supplies_missing_fields_under_same_token() {
        let transport = MockTransport::new();
        transport.push(session_reply("T", SECRET_B64, 0));
        let service = service(&transport);

        let mut fields = BTreeMap::new();
        fields.insert("profile.firstName".to_string(), "Ada".to_string());
        let outcome = service.resume_registration("rt", fields).await;
        assert!(outcome.is_success());

        let call = &transport.calls()[0];
        assert_eq!(call.params["regToken"], "rt");
        assert_eq!(call.params["profile.firstName"], "Ada");
    }

    #[tokio::test]
    async fn transport_failure_yields_network_sentinel() {
        let transport = MockTransport::new();
        transport.push_failure(TransportError::Timeout);
        let outcome = service(&transport)
            .register(RegistrationParams::new("u", "p"))
            .await;
        match outcome {
            AuthOutcome::Error(error) => assert_eq!(error.code, codes::NETWORK_ERROR),
            other => panic!("expected error, got {other:?}"),
        }
    }
}

/// Provider returning a fixed grant
struct ScriptedProvider {
    name: &'static str,
    grant: Mutex<Option<Result<ProviderGrant, ProviderError>>>,
}

impl ScriptedProvider {
    fn new(name: &'static str, grant: Result<ProviderGrant, ProviderError>) -> Self {
        Self {
            name,
            grant: Mutex::new(Some(grant)),
        }
    }
}

impl IdentityProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn sign_in(&self, _request: ProviderRequest) -> Result<ProviderGrant, ProviderError> {
        self.grant.lock().unwrap().take().expect("sign_in called twice")
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

mod provider {
    use super::*;

    #[tokio::test]
    async fn conflict_populates_context_from_follow_up_fetch() {
        let transport = MockTransport::new();
        // notifySocialLogin conflicts, then the conflicting-accounts fetch
        transport.push(json!({"errorCode": 403043, "regToken": "rt"}));
        transport.push(json!({
            "errorCode": 0,
            "conflictingAccount": {
                "loginProviders": ["site", "google"],
                "authToken": "temp-auth",
            },
        }));
        let service = service(&transport);

        let provider = ScriptedProvider::new(
            "google",
            Ok(ProviderGrant::Native {
                provider: "google".to_string(),
                session_blob: json!({"google": {"authToken": "blob"}}),
            }),
        );
        let outcome = service.sign_in_with_provider(&provider).await;
        assert_eq!(
            outcome.context(),
            Some(&ResolvableContext::ConflictingAccounts {
                reg_token: "rt".to_string(),
                provider: Some("google".to_string()),
                auth_token: Some("temp-auth".to_string()),
                login_providers: vec!["site".to_string(), "google".to_string()],
            })
        );

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].url.ends_with("/accounts.getConflictingAccount"));
    }

    #[tokio::test]
    async fn conflict_survives_failed_follow_up_fetch() {
        let transport = MockTransport::new();
        // The conflict reply lands, then connectivity drops before the
        // conflicting-accounts fetch
        transport.push(json!({"errorCode": 403043, "regToken": "rt"}));
        transport.push_failure(TransportError::NotConnected);
        let service = service(&transport);

        let provider = ScriptedProvider::new(
            "google",
            Ok(ProviderGrant::Native {
                provider: "google".to_string(),
                session_blob: json!({"google": {"authToken": "blob"}}),
            }),
        );
        let outcome = service.sign_in_with_provider(&provider).await;
        // The interruption survives with a bare context
        assert_eq!(
            outcome.context(),
            Some(&ResolvableContext::ConflictingAccounts {
                reg_token: "rt".to_string(),
                provider: Some("google".to_string()),
                auth_token: None,
                login_providers: Vec::new(),
            })
        );
    }

    #[tokio::test]
    async fn established_session_is_persisted_then_account_refreshed() {
        let transport = MockTransport::new();
        transport.push(json!({"errorCode": 0, "profile": {"firstName": "Ada"}}));
        let service = service(&transport);

        let provider = ScriptedProvider::new(
            "apple",
            Ok(ProviderGrant::Established(Session::new(
                "T",
                SECRET_B64,
                0,
            ))),
        );
        let outcome = service.sign_in_with_provider(&provider).await;
        assert!(outcome.is_success());
        assert_eq!(service.get_session().await.unwrap().token, "T");

        // The refresh ran signed with the established session
        let call = &transport.calls()[0];
        assert!(call.url.ends_with("/accounts.getAccountInfo"));
        assert_eq!(call.params["oauth_token"], "T");
        assert!(!call.params["sig"].is_empty());
    }

    #[tokio::test]
    async fn sso_code_is_exchanged_with_pkce() {
        let transport = MockTransport::new();
        transport.push(json!({
            "access_token": "T",
            "session_secret": SECRET_B64,
            "expires_in": 3600,
        }));
        transport.push(json!({"errorCode": 0, "profile": {}}));
        let service = service(&transport);

        let provider = ScriptedProvider::new(
            "sso",
            Ok(ProviderGrant::SsoCode {
                code: "auth-code".to_string(),
                redirect_uri: "app://callback".to_string(),
            }),
        );
        let outcome = service.sign_in_with_provider(&provider).await;
        assert!(outcome.is_success());
        assert_eq!(service.get_session().await.unwrap().expiration, 3600);

        let calls = transport.calls();
        assert_eq!(
            calls[0].url,
            "https://fidm.us1.api.example.com/oauth/token"
        );
        assert_eq!(calls[0].params["grant_type"], "authorization_code");
        assert_eq!(calls[0].params["code"], "auth-code");
        assert!(!calls[0].params["code_verifier"].is_empty());
        // Token exchange carries no API envelope
        assert!(!calls[0].params.contains_key("apiKey"));
    }

    #[tokio::test]
    async fn cancelled_provider_maps_to_sentinel_with_details() {
        let transport = MockTransport::new();
        let service = service(&transport);
        let provider = ScriptedProvider::new("google", Err(ProviderError::Cancelled));

        let outcome = service.sign_in_with_provider(&provider).await;
        match outcome {
            AuthOutcome::Error(error) => {
                assert_eq!(error.code, codes::OPERATION_FAILED);
                assert!(error.details.unwrap().contains("cancelled"));
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert!(transport.calls().is_empty());
    }
}

mod link {
    use super::*;

    fn conflict_context() -> ResolvableContext {
        ResolvableContext::ConflictingAccounts {
            reg_token: "rt".to_string(),
            provider: Some("google".to_string()),
            auth_token: None,
            login_providers: vec!["site".to_string()],
        }
    }

    #[tokio::test]
    async fn resolve_to_site_relogs_then_connects() {
        let transport = MockTransport::new();
        transport.push(session_reply("T", SECRET_B64, 0));
        transport.push(json!({"errorCode": 0}));
        let service = service(&transport);

        let outcome = service
            .resolve_link_to_site(&conflict_context(), "ada@example.com", "pw")
            .await;
        assert!(outcome.is_success());

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].params["loginMode"], "link");
        assert_eq!(calls[0].params["regToken"], "rt");
        assert!(calls[1].url.ends_with("/socialize.addConnection"));
        // The connect call runs signed with the freshly minted session
        assert_eq!(calls[1].params["oauth_token"], "T");
    }

    #[tokio::test]
    async fn resolve_to_provider_threads_reg_token() {
        let transport = MockTransport::new();
        transport.push(session_reply("T", SECRET_B64, 0));
        transport.push(json!({"errorCode": 0}));
        let service = service(&transport);

        let provider = ScriptedProvider::new(
            "google",
            Ok(ProviderGrant::Native {
                provider: "google".to_string(),
                session_blob: json!({"google": {"authToken": "blob"}}),
            }),
        );
        let outcome = service
            .resolve_link_to_provider(&conflict_context(), &provider)
            .await;
        assert!(outcome.is_success());

        let calls = transport.calls();
        assert!(calls[0].url.ends_with("/socialize.notifySocialLogin"));
        assert_eq!(calls[0].params["regToken"], "rt");
        assert_eq!(calls[0].params["loginMode"], "link");
        assert_eq!(calls[1].params["provider"], "google");
    }

    #[tokio::test]
    async fn wrong_context_kind_is_rejected_cleanly() {
        let transport = MockTransport::new();
        let service = service(&transport);
        let context = ResolvableContext::PendingRegistration {
            reg_token: "rt".to_string(),
            missing_required_fields: Vec::new(),
        };
        let outcome = service.resolve_link_to_site(&context, "u", "p").await;
        match outcome {
            AuthOutcome::Error(error) => assert_eq!(error.code, codes::OPERATION_FAILED),
            other => panic!("expected error, got {other:?}"),
        }
    }
}

mod two_factor {
    use super::*;
    use crate::application::two_factor::{TwoFactorMode, TwoFactorVerify};

    #[tokio::test]
    async fn init_surfaces_assertion() {
        let transport = MockTransport::new();
        transport.push(json!({"errorCode": 0, "tfaAssertion": "tfa-a"}));
        let service = service(&transport);

        let outcome = service
            .two_factor()
            .init("rt", "phone", TwoFactorMode::Register)
            .await;
        assert_eq!(outcome.payload().unwrap()["tfaAssertion"], "tfa-a");
        assert_eq!(transport.calls()[0].params["mode"], "register");
    }

    #[tokio::test]
    async fn verify_runs_full_sequence_and_secures_session() {
        let transport = MockTransport::new();
        transport.push(json!({"errorCode": 0, "providerAssertion": "pa"}));
        transport.push(json!({"errorCode": 0}));
        transport.push(session_reply("T", SECRET_B64, 3600));
        let service = service(&transport);

        let outcome = service
            .two_factor()
            .verify(TwoFactorVerify {
                tfa_assertion: "tfa-a".to_string(),
                delivery_token: "dt".to_string(),
                code: "123456".to_string(),
                reg_token: "rt".to_string(),
            })
            .await;
        assert!(outcome.is_success());
        assert!(service.get_session().await.is_some());

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].url.ends_with("/accounts.tfa.finalizeTFA"));
        assert_eq!(calls[1].params["providerAssertion"], "pa");
        assert!(calls[2].url.ends_with("/accounts.finalizeRegistration"));
    }

    #[tokio::test]
    async fn failed_step_short_circuits_remainder() {
        let transport = MockTransport::new();
        transport.push(json!({
            "errorCode": 400006,
            "errorMessage": "invalid code",
        }));
        let service = service(&transport);

        let outcome = service
            .two_factor()
            .verify(TwoFactorVerify {
                tfa_assertion: "tfa-a".to_string(),
                delivery_token: "dt".to_string(),
                code: "000000".to_string(),
                reg_token: "rt".to_string(),
            })
            .await;
        match outcome {
            AuthOutcome::Error(error) => assert_eq!(error.code, 400006),
            other => panic!("expected error, got {other:?}"),
        }
        // finalizeTFA and finalizeRegistration never ran
        assert_eq!(transport.calls().len(), 1);
    }
}

mod captcha {
    use super::*;

    #[tokio::test]
    async fn init_surfaces_challenge() {
        let transport = MockTransport::new();
        transport.push(json!({
            "errorCode": 0,
            "captchaToken": "ct-1",
            "imageUrl": "https://img.example.com/c.png",
        }));
        let service = service(&transport);

        let outcome = service.captcha().init().await;
        assert_eq!(outcome.payload().unwrap()["captchaToken"], "ct-1");
        assert!(
            transport.calls()[0]
                .url
                .ends_with("/accounts.captcha.getChallenge")
        );
    }

    #[tokio::test]
    async fn verify_submits_answer_against_token() {
        let transport = MockTransport::new();
        transport.push(json!({"errorCode": 0, "captchaAssertion": "ca-1"}));
        let service = service(&transport);

        let outcome = service.captcha().verify("ct-1", "seven").await;
        assert_eq!(outcome.payload().unwrap()["captchaAssertion"], "ca-1");

        let call = &transport.calls()[0];
        assert!(call.url.ends_with("/accounts.captcha.verify"));
        assert_eq!(call.params["captchaToken"], "ct-1");
        assert_eq!(call.params["captchaText"], "seven");
    }

    #[tokio::test]
    async fn wrong_answer_maps_to_error() {
        let transport = MockTransport::new();
        transport.push(json!({
            "errorCode": 400022,
            "errorMessage": "invalid captcha",
        }));
        let outcome = service(&transport).captcha().verify("ct-1", "wrong").await;
        match outcome {
            AuthOutcome::Error(error) => assert_eq!(error.code, 400022),
            other => panic!("expected error, got {other:?}"),
        }
    }
}

/// Authenticator returning a fixed credential document
struct ScriptedAuthenticator {
    credential: Option<Value>,
}

impl PasskeyAuthenticator for ScriptedAuthenticator {
    async fn create_credential(&self, _options: Value) -> Result<Option<Value>, ProviderError> {
        Ok(self.credential.clone())
    }

    async fn get_credential(&self, _options: Value) -> Result<Option<Value>, ProviderError> {
        Ok(self.credential.clone())
    }
}

mod passkey {
    use super::*;

    #[tokio::test]
    async fn sign_in_exchanges_assertion_for_session() {
        let transport = MockTransport::new();
        transport.push(json!({
            "errorCode": 0,
            "options": {"challenge": "c"},
            "token": "fido-token",
        }));
        transport.push(session_reply("T", SECRET_B64, 0));
        let service = service(&transport);

        let authenticator = ScriptedAuthenticator {
            credential: Some(json!({"id": "cred-1"})),
        };
        let outcome = service.sign_in_with_passkey(&authenticator).await;
        assert!(outcome.is_success());
        assert!(service.get_session().await.is_some());

        let calls = transport.calls();
        assert!(calls[1].url.ends_with("/accounts.auth.fido.verifyAssertion"));
        assert_eq!(calls[1].params["token"], "fido-token");
        assert!(calls[1].params["authenticatorAssertion"].contains("cred-1"));
    }

    #[tokio::test]
    async fn dismissed_prompt_maps_to_sentinel() {
        let transport = MockTransport::new();
        transport.push(json!({
            "errorCode": 0,
            "options": {"challenge": "c"},
            "token": "fido-token",
        }));
        let service = service(&transport);

        let authenticator = ScriptedAuthenticator { credential: None };
        let outcome = service.sign_in_with_passkey(&authenticator).await;
        match outcome {
            AuthOutcome::Error(error) => assert_eq!(error.code, codes::OPERATION_FAILED),
            other => panic!("expected error, got {other:?}"),
        }
        // No verify call after a dismissal
        assert_eq!(transport.calls().len(), 1);
    }
}

mod logout {
    use super::*;

    #[tokio::test]
    async fn logout_clears_state_even_after_server_error() {
        let transport = MockTransport::new();
        transport.push(session_reply("T", SECRET_B64, 0));
        transport.push(json!({"errorCode": 403005, "errorMessage": "unauthorized"}));
        let service = service(&transport);

        service.login(LoginParams::new("u", "p")).await;
        assert!(service.available_session().await);

        let outcome = service.logout().await;
        match outcome {
            AuthOutcome::Error(error) => assert_eq!(error.code, 403005),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(!service.available_session().await);
        assert!(service.get_session().await.is_none());
    }

    #[tokio::test]
    async fn logout_request_is_signed() {
        let transport = MockTransport::new();
        transport.push(session_reply("T", SECRET_B64, 0));
        transport.push(json!({"errorCode": 0}));
        let service = service(&transport);

        service.login(LoginParams::new("u", "p")).await;
        let outcome = service.logout().await;
        assert!(outcome.is_success());

        let calls = transport.calls();
        assert!(calls[1].url.ends_with("/accounts.logout"));
        assert_eq!(calls[1].params["oauth_token"], "T");
        assert!(calls[1].params.contains_key("sig"));
    }
}
