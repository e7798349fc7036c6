use thiserror::Error;

use crate::auth::StoreError;

use super::transport::TransportError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server returned {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Credential storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Map a non-success status from a protected endpoint.
    ///
    /// 401 only reaches this point after the session already spent its refresh,
    /// so it is reported as a plain server error rather than re-triggering auth.
    pub fn from_status(status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            403 => ApiError::Forbidden(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            _ => ApiError::ServerError {
                status,
                body: truncated,
            },
        }
    }

    /// True when the caller should send the user back to the login step.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthenticated | ApiError::SessionExpired)
    }

    /// Pull a human-readable message out of a backend error payload.
    ///
    /// The backend answers with `{"error": ...}`, `{"detail": ...}` or a map of
    /// field errors; anything else is returned as-is.
    pub fn server_message(&self) -> Option<String> {
        let body = match self {
            ApiError::ServerError { body, .. }
            | ApiError::Forbidden(body)
            | ApiError::NotFound(body) => body,
            _ => return None,
        };
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => return Some(body.clone()).filter(|b| !b.is_empty()),
        };
        for key in ["error", "detail", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return Some(msg.to_string());
            }
        }
        if let Some(fields) = value.as_object() {
            let parts: Vec<String> = fields
                .iter()
                .map(|(field, errs)| match errs {
                    serde_json::Value::Array(items) => {
                        let msgs: Vec<&str> = items.iter().filter_map(|i| i.as_str()).collect();
                        format!("{}: {}", field, msgs.join(" "))
                    }
                    serde_json::Value::String(s) => format!("{}: {}", field, s),
                    other => format!("{}: {}", field, other),
                })
                .collect();
            if !parts.is_empty() {
                return Some(parts.join(", "));
            }
        }
        Some(body.clone())
    }
}
