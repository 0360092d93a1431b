//! Core Error Types
//!
//! [`CoreError`] is the internal error type threaded through wire, store
//! and flow code with `?`. It never crosses the public flow boundary:
//! flows convert it into the error arm of an
//! [`AuthOutcome`](crate::outcome::AuthOutcome) via
//! [`CoreError::into_api_error`].

use platform::cipher::CipherError;
use platform::storage::StorageError;
use platform::transport::TransportError;
use thiserror::Error;

use crate::domain::capability::ProviderError;
use crate::outcome::ApiError;

/// Core result type alias
pub type CoreResult<T> = Result<T, CoreError>;

/// Protocol error codes with fixed meaning
pub mod codes {
    /// Success
    pub const OK: u32 = 0;
    /// Registration accepted but required fields are missing
    pub const PENDING_REGISTRATION: u32 = 206001;
    /// Account pending verification (one-time-code waypoint)
    pub const PENDING_VERIFICATION: u32 = 206002;
    /// Login identifier exists on a conflicting account
    pub const LOGIN_IDENTIFIER_EXISTS: u32 = 403043;
    /// Synthesized sentinel: no connectivity / transport timeout
    pub const NETWORK_ERROR: u32 = 500026;
    /// Synthesized sentinel: provider or serialization failure
    pub const OPERATION_FAILED: u32 = 500001;
}

/// Internal error variants
#[derive(Debug, Error)]
pub enum CoreError {
    /// Network-level failure (no connectivity, timeout, broken reply)
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Malformed payload from the server or a capability
    #[error("malformed payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-resolvable protocol error reported by the server
    #[error("api error {code}: {message}", code = .0.code, message = .0.message)]
    Api(ApiError),

    /// External provider capability failed or was cancelled
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),

    /// Secure storage backend failed
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Cipher failure on the session record
    #[error("cipher failure: {0}")]
    Cipher(#[from] CipherError),

    /// An operation required a session and none is available
    #[error("no valid session")]
    NoSession,

    /// Malformed URL built from configuration
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    /// Unexpected runtime fault converted at the flow boundary
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Collapse into the wire-level error taxonomy.
    ///
    /// Transport failures map to the fixed network sentinel; provider and
    /// serialization failures to the operation-failed sentinel with the
    /// original message as details; server errors pass through.
    pub fn into_api_error(self) -> ApiError {
        match self {
            CoreError::Api(error) => error,
            CoreError::Transport(e) => {
                ApiError::new(codes::NETWORK_ERROR, "network error").with_details(e.to_string())
            }
            CoreError::Serialization(e) => {
                ApiError::new(codes::OPERATION_FAILED, "malformed payload")
                    .with_details(e.to_string())
            }
            CoreError::Provider(e) => {
                ApiError::new(codes::OPERATION_FAILED, "provider error").with_details(e.to_string())
            }
            other => {
                ApiError::new(codes::OPERATION_FAILED, "operation failed")
                    .with_details(other.to_string())
            }
        }
    }

    /// Log with a level matching severity, mirroring where the fault sits
    pub fn log(&self) {
        match self {
            CoreError::Transport(e) => {
                tracing::warn!(error = %e, "transport failure");
            }
            CoreError::Api(e) => {
                tracing::debug!(code = e.code, message = %e.message, "api error");
            }
            CoreError::Provider(e) => {
                tracing::warn!(error = %e, "provider failure");
            }
            other => {
                tracing::error!(error = %other, "core failure");
            }
        }
    }
}
