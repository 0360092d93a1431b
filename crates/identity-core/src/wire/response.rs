//! Response Model
//!
//! Thin typed view over the server's JSON reply. `is_error()` is the sole
//! branching predicate for flow logic: business errors arrive with a
//! successful transport status, so HTTP status codes never drive flows.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::session::Session;
use crate::error::{CoreError, CoreResult};
use crate::outcome::ApiError;

/// Parsed API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    raw: Value,
}

impl ApiResponse {
    /// Parse a response body. Non-object payloads are rejected.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let raw: Value = serde_json::from_slice(bytes)?;
        if !raw.is_object() {
            return Err(CoreError::Internal(
                "response body is not a JSON object".to_string(),
            ));
        }
        Ok(Self { raw })
    }

    /// Wrap an already-parsed value (PKCE token replies, tests)
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// Server error code; absent or zero means success
    pub fn error_code(&self) -> u32 {
        self.raw
            .get("errorCode")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32
    }

    /// The sole branching predicate for flow logic
    pub fn is_error(&self) -> bool {
        self.error_code() != 0
    }

    pub fn error_message(&self) -> Option<&str> {
        self.raw.get("errorMessage").and_then(Value::as_str)
    }

    pub fn error_details(&self) -> Option<&str> {
        self.raw.get("errorDetails").and_then(Value::as_str)
    }

    /// Server-side correlation id for this call
    pub fn call_id(&self) -> Option<&str> {
        self.raw.get("callId").and_then(Value::as_str)
    }

    /// Typed field extraction by dotted path
    pub fn field<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.lookup(path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn string_field(&self, path: &str) -> Option<String> {
        self.lookup(path)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Boolean flag; absent reads as `false`
    pub fn flag(&self, path: &str) -> bool {
        self.lookup(path).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn has_field(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Session issued by this reply, when present.
    ///
    /// Mobile-targeted replies carry
    /// `sessionInfo: { sessionToken, sessionSecret, expires_in }`.
    pub fn session(&self) -> Option<Session> {
        let token = self.string_field("sessionInfo.sessionToken")?;
        let secret = self.string_field("sessionInfo.sessionSecret")?;
        let expiration = self.field::<i64>("sessionInfo.expires_in").unwrap_or(0);
        Some(Session::new(token, secret, expiration))
    }

    /// Convert a non-zero reply into the protocol error taxonomy
    pub fn to_api_error(&self) -> ApiError {
        let mut error = ApiError::new(
            self.error_code(),
            self.error_message().unwrap_or("server error"),
        );
        if let Some(details) = self.error_details() {
            error = error.with_details(details);
        }
        error
    }

    pub fn as_json(&self) -> &Value {
        &self.raw
    }

    pub fn into_payload(self) -> Value {
        self.raw
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.raw, |value, segment| value.get(segment))
    }
}
