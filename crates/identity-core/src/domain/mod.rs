//! Domain Layer
//!
//! Entities, value types and capability traits.

pub mod capability;
pub mod resolvable;
pub mod session;

// Re-exports
pub use capability::{IdentityProvider, LoginMode, PasskeyAuthenticator, ProviderGrant};
pub use resolvable::ResolvableContext;
pub use session::{Session, SessionRecord, SessionSecurityLevel};
