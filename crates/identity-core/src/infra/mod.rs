//! Infrastructure Layer
//!
//! Adapters over the injected platform capabilities: request execution
//! over the transport, encrypted session persistence over secure storage.

pub mod api;
pub mod session_store;

// Re-exports
pub use api::ApiService;
pub use session_store::{SessionEvent, SessionStore};
