//! Resolvable-Interruption Classifier
//!
//! Pure, total function over a response: every reply maps to exactly one
//! of success, error, or a resolvable interruption. Invoked immediately
//! after every protocol-waypoint network call.

use crate::domain::resolvable::{ResolvableContext, parse_missing_fields};
use crate::error::codes;
use crate::outcome::ApiError;
use crate::wire::response::ApiResponse;

/// Three-way classification of one response
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Success,
    Error(ApiError),
    Resolvable(ResolvableContext),
}

/// Classify a response.
///
/// Resolvable conditions:
/// - pending-registration sentinel: missing fields extracted from details
/// - identifier-conflict sentinel: the flow follows up with a
///   conflicting-accounts fetch to populate the context
/// - a verification token present even on a code-0 reply (one-time-code
///   waypoints interrupt on success)
pub fn classify(response: &ApiResponse) -> Disposition {
    let reg_token = response.string_field("regToken").unwrap_or_default();

    match response.error_code() {
        codes::OK => match response.string_field("vToken") {
            Some(verification_token) => Disposition::Resolvable(
                ResolvableContext::PendingVerification {
                    reg_token,
                    verification_token: Some(verification_token),
                },
            ),
            None => Disposition::Success,
        },
        codes::PENDING_REGISTRATION => {
            Disposition::Resolvable(ResolvableContext::PendingRegistration {
                reg_token,
                missing_required_fields: parse_missing_fields(response.error_details()),
            })
        }
        codes::PENDING_VERIFICATION => {
            Disposition::Resolvable(ResolvableContext::PendingVerification {
                reg_token,
                verification_token: response.string_field("vToken"),
            })
        }
        codes::LOGIN_IDENTIFIER_EXISTS => {
            // Conflict details live in a follow-up fetch; the flow fills
            // provider/auth_token/login_providers before surfacing this.
            Disposition::Resolvable(ResolvableContext::ConflictingAccounts {
                reg_token,
                provider: None,
                auth_token: None,
                login_providers: Vec::new(),
            })
        }
        _ => Disposition::Error(response.to_api_error()),
    }
}
