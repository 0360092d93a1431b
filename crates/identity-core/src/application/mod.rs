//! Application Layer
//!
//! One use case per flow, plus the host-facing service facade.

pub mod captcha;
pub mod config;
pub mod link;
pub mod login;
pub mod passkey;
pub mod provider;
pub mod register;
pub mod service;
pub mod two_factor;

pub(crate) mod support;

// Re-exports
pub use captcha::CaptchaFlow;
pub use config::CoreConfig;
pub use link::LinkResolveFlow;
pub use login::{LoginFlow, LoginParams};
pub use passkey::PasskeyFlow;
pub use provider::ProviderFlow;
pub use register::{RegistrationFlow, RegistrationParams};
pub use service::IdentityService;
pub use two_factor::{TwoFactorFlow, TwoFactorMode, TwoFactorVerify};
