//! Flow Outcome Types
//!
//! Every flow operation resolves to exactly one [`AuthOutcome`]:
//! `Success` with the response payload, `Error` with a protocol error, or
//! `Interrupted` with the context needed to resume. `Interrupted` is a
//! valid terminal state, not an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::resolvable::ResolvableContext;
use crate::error::CoreResult;

/// Protocol-level error: server code, message, optional details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Server error code (or a synthesized sentinel)
    pub code: u32,
    /// Human-readable message
    pub message: String,
    /// Additional details (server `errorDetails` or original fault text)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Tri-state terminal outcome of a flow operation
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// Operation completed; payload is the parsed response body
    Success(Value),
    /// Operation failed with a protocol or synthesized error
    Error(ApiError),
    /// Flow paused on a resolvable condition; caller must continue it
    Interrupted(ResolvableContext),
}

impl AuthOutcome {
    /// Collapse an internal result into the public tri-state contract.
    /// Expected conditions never escape the flow boundary as `Err`.
    pub fn from_result(result: CoreResult<AuthOutcome>) -> AuthOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(error) => {
                error.log();
                AuthOutcome::Error(error.into_api_error())
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, AuthOutcome::Interrupted(_))
    }

    /// Success payload, if any
    pub fn payload(&self) -> Option<&Value> {
        match self {
            AuthOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Interruption context, if any
    pub fn context(&self) -> Option<&ResolvableContext> {
        match self {
            AuthOutcome::Interrupted(context) => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, codes};

    #[test]
    fn test_from_result_converts_error_at_boundary() {
        let outcome = AuthOutcome::from_result(Err(CoreError::NoSession));
        match outcome {
            AuthOutcome::Error(e) => assert_eq!(e.code, codes::OPERATION_FAILED),
            other => panic!("expected error outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_from_result_passes_success() {
        let outcome =
            AuthOutcome::from_result(Ok(AuthOutcome::Success(serde_json::json!({"ok": true}))));
        assert!(outcome.is_success());
        assert_eq!(outcome.payload().unwrap()["ok"], true);
    }
}
