//! Request and response descriptions passed through the session.
//!
//! An `ApiRequest` is a plain value so the session can replay it verbatim
//! after a token refresh.

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};

use super::ApiError;

/// One HTTP call against the protected backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body. Serialization failures surface as `Validation`
    /// since they can only come from caller-supplied data.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Validation(format!("Could not encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Attach an already-built JSON value.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response as returned by the transport, body unread by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response (status {}): {}", self.status, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let req = ApiRequest::get("/api/appointments/")
            .query("patient", 7)
            .header("X-Trace", "abc");
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query, vec![("patient".to_string(), "7".to_string())]);
        assert_eq!(req.headers.len(), 1);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_json_body() {
        let req = ApiRequest::put("/api/appointments/3/status/")
            .json(&serde_json::json!({"status": "COMPLETED"}))
            .expect("encode body");
        assert_eq!(req.body, Some(serde_json::json!({"status": "COMPLETED"})));
    }

    #[test]
    fn test_response_helpers() {
        assert!(ApiResponse::new(204, "").is_success());
        assert!(!ApiResponse::new(401, "").is_success());

        let resp = ApiResponse::new(200, r#"{"ok": true}"#);
        let value: serde_json::Value = resp.json().expect("valid json");
        assert_eq!(value["ok"], true);

        let bad = ApiResponse::new(200, "<html>");
        assert!(matches!(bad.json::<serde_json::Value>(), Err(ApiError::InvalidResponse(_))));
    }
}
