//! Conversation service errors
//!
//! Transport-level error type for the remote service plus a helper that turns
//! cryptic API error bodies into user-friendly messages.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::mistral::parser::error::ParseError;

/// Failure talking to the remote conversation service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request could not be sent, or the body broke off mid-stream
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status
    #[error("{operation} failed: {status} - {message}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        message: String,
    },
    /// The event stream could not be decoded
    #[error("Event stream decoding failed: {0}")]
    Decode(#[from] ParseError),
}

/// Structured information about a service error
#[derive(Debug, Clone)]
pub struct ServiceErrorInfo {
    /// Error code from the body, or `UNKNOWN`
    pub code: String,
    /// Enhanced, user-friendly message for end users
    pub user_message: String,
    /// Original message from the body (for logging)
    pub original_message: String,
}

/// Enhances a service error with a user-friendly message
///
/// # Arguments
/// * `status` - HTTP status of the failed response
/// * `body` - Raw response body; usually `{"message": "...", "code": "..."}`
///   or a validation error of the form `{"detail": ...}`
pub fn enhance_service_error(status: StatusCode, body: &str) -> ServiceErrorInfo {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    let original_message = json
        .get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| match json.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                trimmed.to_string()
            }
        });

    let code = match json.get("code") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "UNKNOWN".to_string(),
        Some(other) => other.to_string(),
    };

    let user_message = match status.as_u16() {
        401 => "Authentication failed. Check apiKey in config.json or MISTRAL_API_KEY.".to_string(),
        403 => "Access denied. The API key is not allowed to use conversations.".to_string(),
        404 => format!("Not found: {}", original_message),
        422 => format!("Invalid request: {}", original_message),
        429 => "Rate limit exceeded. Please wait a moment before retrying.".to_string(),
        s if s >= 500 => {
            "Conversation service temporarily unavailable. Please try again later.".to_string()
        }
        _ if code == "UNKNOWN" => original_message.clone(),
        _ => format!("{} (code: {})", original_message, code),
    };

    ServiceErrorInfo {
        code,
        user_message,
        original_message,
    }
}
