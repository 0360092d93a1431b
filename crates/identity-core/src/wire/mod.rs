//! Wire Layer
//!
//! Request building, response parsing, signing and response
//! classification.

pub mod classify;
pub mod request;
pub mod response;
pub mod signer;

// Re-exports
pub use classify::{Disposition, classify};
pub use request::ApiRequest;
pub use response::ApiResponse;
pub use signer::{SigningSpec, sign};
