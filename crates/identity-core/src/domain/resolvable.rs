//! Resolvable Interruption Context
//!
//! When a flow hits a known resolvable condition the server reply is
//! distilled into a [`ResolvableContext`]: everything the caller needs to
//! resume the flow later, possibly from another process. The context is
//! JSON-serializable for cross-process handoff and carries no secrets
//! beyond short-lived server tokens.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Typed description of a paused flow plus the data needed to resume it.
///
/// Created only when a response matches a known resolvable condition;
/// discarded once resolved or abandoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResolvableContext {
    /// Registration accepted but required schema fields are missing.
    /// Resume by re-registering with the missing fields supplied.
    #[serde(rename_all = "camelCase")]
    PendingRegistration {
        /// Token correlating the registration sequence
        reg_token: String,
        /// Field names the server still requires; may be empty when the
        /// server did not enumerate them
        missing_required_fields: Vec<String>,
    },

    /// The login identifier already belongs to another account.
    /// Resume by linking with site credentials or a provider sign-in.
    #[serde(rename_all = "camelCase")]
    ConflictingAccounts {
        /// Token correlating the link sequence
        reg_token: String,
        /// Provider that triggered the conflict, when known
        provider: Option<String>,
        /// Temporary auth token for the conflicting identity
        auth_token: Option<String>,
        /// Login methods already bound to the existing account
        login_providers: Vec<String>,
    },

    /// One-time-code waypoint: the account needs code verification.
    /// May interrupt even a code-0 reply when a verification token is
    /// present.
    #[serde(rename_all = "camelCase")]
    PendingVerification {
        /// Token correlating the registration sequence
        reg_token: String,
        /// Verification token for the code-entry continuation
        verification_token: Option<String>,
    },
}

impl ResolvableContext {
    /// The registration token shared by every variant
    pub fn reg_token(&self) -> &str {
        match self {
            ResolvableContext::PendingRegistration { reg_token, .. }
            | ResolvableContext::ConflictingAccounts { reg_token, .. }
            | ResolvableContext::PendingVerification { reg_token, .. } => reg_token,
        }
    }

    /// Serialize for cross-process handoff
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rehydrate a context handed off as JSON
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Extract missing-field names from an `errorDetails` string.
///
/// Accepts both the bare comma list (`"firstName,lastName"`) and the
/// prefixed sentence form (`"missing required fields: firstName, lastName"`).
/// Never fails; unknown shapes yield an empty list.
pub fn parse_missing_fields(details: Option<&str>) -> Vec<String> {
    let Some(details) = details else {
        return Vec::new();
    };
    let list = details.rsplit(':').next().unwrap_or(details);
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_comma_list() {
        assert_eq!(
            parse_missing_fields(Some("firstName,lastName")),
            vec!["firstName", "lastName"]
        );
    }

    #[test]
    fn test_parse_prefixed_sentence() {
        assert_eq!(
            parse_missing_fields(Some("missing required fields: firstName, lastName")),
            vec!["firstName", "lastName"]
        );
    }

    #[test]
    fn test_parse_empty_and_absent_details() {
        assert!(parse_missing_fields(None).is_empty());
        assert!(parse_missing_fields(Some("")).is_empty());
        assert!(parse_missing_fields(Some("  ,  ")).is_empty());
    }

    #[test]
    fn test_json_handoff_roundtrip() {
        let context = ResolvableContext::ConflictingAccounts {
            reg_token: "rt-1".to_string(),
            provider: Some("google".to_string()),
            auth_token: None,
            login_providers: vec!["site".to_string(), "google".to_string()],
        };
        let json = context.to_json().unwrap();
        assert_eq!(ResolvableContext::from_json(&json).unwrap(), context);
        assert!(json.contains("\"type\":\"conflictingAccounts\""));
    }

    #[test]
    fn test_reg_token_accessor() {
        let context = ResolvableContext::PendingRegistration {
            reg_token: "rt-2".to_string(),
            missing_required_fields: Vec::new(),
        };
        assert_eq!(context.reg_token(), "rt-2");
    }
}
