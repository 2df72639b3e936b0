//! Structured errors for calls against the C-Money API.

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

/// Categories of API errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection failure or other transport-level error
    Transport,
    /// Request exceeded the configured timeout
    Timeout,
    /// HTTP error status (4xx other than 401, or 5xx)
    HttpStatus,
    /// 401 that was not recovered and left the session in place
    /// (credentials rejected by a public endpoint, or the retry also got 401)
    Unauthorized,
    /// 401 with no refresh token to recover with; the session was cleared
    SessionEnded,
    /// The refresh endpoint rejected the refresh token or could not be reached
    RefreshFailed,
    /// Response body could not be decoded
    Parse,
    /// Rejected locally before any request was sent
    Validation,
    /// Session state could not be persisted
    Storage,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiErrorKind::Transport => "transport",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::HttpStatus => "http_status",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::SessionEnded => "session_ended",
            ApiErrorKind::RefreshFailed => "refresh_failed",
            ApiErrorKind::Parse => "parse",
            ApiErrorKind::Validation => "validation",
            ApiErrorKind::Storage => "storage",
        };
        f.write_str(label)
    }
}

/// Structured error from the API client with kind and details.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// HTTP status when the backend answered
    pub status: Option<StatusCode>,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw response body or underlying error text
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error from a non-success HTTP response.
    ///
    /// 401 maps to [`ApiErrorKind::Unauthorized`]; everything else is
    /// [`ApiErrorKind::HttpStatus`]. The message prefers the backend's own
    /// wording (see [`backend_message`]).
    pub fn http_status(status: StatusCode, body: &str) -> Self {
        let kind = if status == StatusCode::UNAUTHORIZED {
            ApiErrorKind::Unauthorized
        } else {
            ApiErrorKind::HttpStatus
        };
        let message = backend_message(body).unwrap_or_else(|| status_line(status));
        Self {
            kind,
            status: Some(status),
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn from_transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ApiErrorKind::Timeout
        } else {
            ApiErrorKind::Transport
        };
        Self {
            kind,
            status: None,
            message: format!("Request failed: {err}"),
            details: None,
        }
    }

    pub fn parse(message: impl Into<String>, body: &str) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            status: None,
            message: message.into(),
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    pub fn storage(err: &anyhow::Error) -> Self {
        Self::new(ApiErrorKind::Storage, format!("Failed to save session: {err:#}"))
    }

    /// Marks a 401 after which the session was cleared.
    pub fn into_session_ended(self) -> Self {
        Self {
            kind: ApiErrorKind::SessionEnded,
            ..self
        }
    }

    /// Re-labels an error produced while calling the refresh endpoint.
    pub fn into_refresh_failure(self) -> Self {
        Self {
            kind: ApiErrorKind::RefreshFailed,
            message: format!("Session refresh failed: {}", self.message),
            ..self
        }
    }

    /// True when the session has been cleared and the user must log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::SessionEnded | ApiErrorKind::RefreshFailed
        )
    }

    /// Human-readable message for the person at the keyboard.
    pub fn user_message(&self) -> &str {
        &self.message
    }

    /// Same as [`ApiError::user_message`], but substitutes `fallback` when the
    /// backend gave no usable message of its own.
    pub fn user_message_or(&self, fallback: &str) -> String {
        let from_backend = self
            .details
            .as_deref()
            .and_then(backend_message)
            .is_some();
        if from_backend || self.status.is_none() {
            self.message.clone()
        } else {
            fallback.to_string()
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {}: {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

/// Extracts a readable message from a backend error payload.
///
/// Order: a `detail` string, then every field's messages (arrays flattened,
/// nested objects walked) joined with newlines in payload order, then a bare
/// JSON string.
/// Returns `None` for empty or non-JSON bodies.
pub fn backend_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = json.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }

    let mut messages = Vec::new();
    collect_messages(&json, &mut messages);
    let joined = messages.join("\n");
    (!joined.trim().is_empty()).then_some(joined)
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_messages(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_messages(item, out)),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(_) | Value::Null => {}
    }
}
