//! Typed errors for upstream LLM calls
//!
//! Failures are classified by HTTP status so callers can tell an expired key
//! from a rate limit without string matching. Every variant keeps the
//! human-readable message extracted from the upstream body, which is what a
//! panel ends up showing.

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Shown on a panel when nothing more specific is known
pub const GENERIC_REQUEST_FAILURE: &str = "Request failed";

/// LLM operation errors with typed variants
///
/// - `Unauthorized` (401) - key missing, expired or invalid
/// - `RateLimited` (429) - quota exceeded
/// - `BadRequest` (400) - malformed request or unknown model
/// - `ServiceError` (5xx) - upstream trouble
/// - `Status` - any other non-success status
/// - `Network` - connection failure
/// - `Timeout` - no answer within the configured bound
/// - `MalformedResponse` - success status with an unreadable body
/// - `Other` - catch-all for unhandled errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Wraps `anyhow::Error` for compatibility with application plumbing.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Check if this error indicates an auth issue the user must fix
    pub fn needs_new_key(&self) -> bool {
        matches!(self, LlmError::Unauthorized(_))
    }

    /// Check if this error indicates a rate limit
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited(_))
    }

    /// Convert HTTP status code and extracted message into typed LlmError
    pub fn from_http_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 => LlmError::Unauthorized(message),
            429 => LlmError::RateLimited(message),
            400 => LlmError::BadRequest(message),
            500..=599 => LlmError::ServiceError(message),
            code => LlmError::Status {
                status: code,
                message,
            },
        }
    }

    /// Classify a non-success response from its status and raw body
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        Self::from_http_status(status, extract_error_message(status, body))
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else if e.is_decode() {
            LlmError::MalformedResponse(e.to_string())
        } else {
            LlmError::Other(e.into())
        }
    }

    /// Message taken from an upstream error body, for status-classified errors
    pub fn body_message(&self) -> Option<&str> {
        match self {
            LlmError::Unauthorized(m)
            | LlmError::RateLimited(m)
            | LlmError::BadRequest(m)
            | LlmError::ServiceError(m)
            | LlmError::Status { message: m, .. } => Some(m.as_str()),
            _ => None,
        }
    }

    /// Text recorded on a panel's `error` field
    ///
    /// Prefers the message the upstream sent, then the error's own message,
    /// then [`GENERIC_REQUEST_FAILURE`].
    pub fn panel_message(&self) -> String {
        let message = match self {
            LlmError::Network(m) => m.clone(),
            LlmError::Other(e) => e.to_string(),
            _ => match self.body_message() {
                Some(m) => m.to_string(),
                None => self.to_string(),
            },
        };

        if message.trim().is_empty() {
            GENERIC_REQUEST_FAILURE.to_string()
        } else {
            message
        }
    }
}

/// Pull a human-readable message out of an error response body
///
/// Handles `{"error":{"message":..}}`, `{"error":"text"}`, a structured
/// `error` object (serialized as JSON), a top-level `message`, and non-JSON
/// bodies (raw text). Falls back to the status reason phrase.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
                if let Some(message) = error
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                {
                    return message.to_string();
                }
                if let Some(text) = error.as_str() {
                    if !text.is_empty() {
                        return text.to_string();
                    }
                } else {
                    return error.to_string();
                }
            }
            if let Some(message) = value
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
            {
                return message.to_string();
            }
        }
        Err(_) => {
            let text = body.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }

    status
        .canonical_reason()
        .unwrap_or(GENERIC_REQUEST_FAILURE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        let err = LlmError::from_http_status(StatusCode::UNAUTHORIZED, "Invalid key".to_string());
        assert!(matches!(err, LlmError::Unauthorized(_)));
        assert!(err.needs_new_key());

        let err =
            LlmError::from_http_status(StatusCode::TOO_MANY_REQUESTS, "Slow down".to_string());
        assert!(matches!(err, LlmError::RateLimited(_)));
        assert!(err.is_rate_limited());

        let err = LlmError::from_http_status(StatusCode::BAD_REQUEST, "Bad model".to_string());
        assert!(matches!(err, LlmError::BadRequest(_)));

        let err = LlmError::from_http_status(StatusCode::BAD_GATEWAY, "Upstream".to_string());
        assert!(matches!(err, LlmError::ServiceError(_)));

        let err = LlmError::from_http_status(StatusCode::PAYMENT_REQUIRED, "Credits".to_string());
        assert!(matches!(err, LlmError::Status { status: 402, .. }));
    }

    #[test]
    fn test_extract_nested_message() {
        let body = r#"{"error":{"message":"No credits left","code":402}}"#;
        assert_eq!(
            extract_error_message(StatusCode::PAYMENT_REQUIRED, body),
            "No credits left"
        );
    }

    #[test]
    fn test_extract_string_error() {
        let body = r#"{"error":"Missing Authorization header"}"#;
        assert_eq!(
            extract_error_message(StatusCode::UNAUTHORIZED, body),
            "Missing Authorization header"
        );
    }

    #[test]
    fn test_extract_structured_error_is_serialized() {
        let body = r#"{"error":{"code":"quota"}}"#;
        assert_eq!(
            extract_error_message(StatusCode::TOO_MANY_REQUESTS, body),
            r#"{"code":"quota"}"#
        );
    }

    #[test]
    fn test_extract_non_json_body() {
        assert_eq!(
            extract_error_message(StatusCode::BAD_GATEWAY, "upstream exploded\n"),
            "upstream exploded"
        );
    }

    #[test]
    fn test_extract_falls_back_to_reason() {
        assert_eq!(
            extract_error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
        assert_eq!(
            extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, "{}"),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_panel_message_prefers_upstream_text() {
        let err = LlmError::from_response_body(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"User not found."}}"#,
        );
        assert_eq!(err.panel_message(), "User not found.");
        assert_eq!(err.to_string(), "Unauthorized: User not found.");
    }

    #[test]
    fn test_panel_message_generic_fallback() {
        let err = LlmError::Network("   ".to_string());
        assert_eq!(err.panel_message(), GENERIC_REQUEST_FAILURE);

        let err = LlmError::Timeout(Duration::from_secs(30));
        assert_eq!(err.panel_message(), "Request timed out after 30s");
    }

    #[test]
    fn test_convert_to_anyhow() {
        let llm_err = LlmError::Unauthorized("test".to_string());
        let anyhow_err: anyhow::Error = llm_err.into();
        assert!(anyhow_err.to_string().contains("Unauthorized"));
    }
}
