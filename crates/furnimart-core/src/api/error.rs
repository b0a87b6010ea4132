use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session expired or invalid")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Request rejected: {0}")]
    Validation(ErrorBody),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::Validation(ErrorBody::parse(body)),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// A decoded 400 response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBody {
    /// Per-field messages, e.g. `{"price": ["A valid number is required."]}`
    FieldErrors(BTreeMap<String, String>),
    /// A single message not tied to a field
    Global(String),
}

impl ErrorBody {
    /// Interpret the error shapes the API produces. Anything unrecognized
    /// becomes a `Global` message carrying the raw (truncated) text.
    pub fn parse(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => return ErrorBody::Global(ApiError::truncate_body(body.trim())),
        };

        match value {
            Value::Object(map) => {
                for key in ["detail", "error", "message", "non_field_errors"] {
                    if let Some(msg) = map.get(key).and_then(Self::message) {
                        return ErrorBody::Global(msg);
                    }
                }
                let fields: BTreeMap<String, String> = map
                    .iter()
                    .filter_map(|(k, v)| Self::message(v).map(|m| (k.clone(), m)))
                    .collect();
                if fields.is_empty() {
                    ErrorBody::Global(ApiError::truncate_body(body.trim()))
                } else {
                    ErrorBody::FieldErrors(fields)
                }
            }
            other => Self::message(&other)
                .map(ErrorBody::Global)
                .unwrap_or_else(|| ErrorBody::Global(ApiError::truncate_body(body.trim()))),
        }
    }

    fn message(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(Self::message).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            }
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            ErrorBody::FieldErrors(fields) => fields.get(name).map(String::as_str),
            ErrorBody::Global(_) => None,
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorBody::Global(msg) => write!(f, "{}", msg),
            ErrorBody::FieldErrors(fields) => {
                let joined: Vec<String> = fields.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{}", joined.join("; "))
            }
        }
    }
}
