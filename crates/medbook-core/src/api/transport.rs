//! HTTP transport used by the session.
//!
//! The session never talks to `reqwest` directly; it goes through the
//! `Transport` trait so the refresh logic can be exercised without a server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::debug;

use super::request::{ApiRequest, ApiResponse};

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("refusing to send a request outside the API base URL: {0}")]
    ForeignUrl(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `req`, attaching `Authorization: Bearer <token>` when a token is given.
    async fn send(&self, req: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, TransportError>;
}

/// Transport backed by a pooled `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a request path against the base URL. Absolute URLs are
    /// refused so the bearer token only ever goes to the configured server.
    fn url_for(&self, path: &str) -> Result<String, TransportError> {
        if path.contains("://") {
            return Err(TransportError::ForeignUrl(path.to_string()));
        }
        Ok(if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, req: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&req.path)?;
        debug!(method = %req.method, url = %url, authenticated = bearer.is_some(), "Sending request");

        let mut builder = self
            .client
            .request(req.method.clone(), &url)
            .header(header::ACCEPT, "application/json");

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url = %url, status, "Received response");

        Ok(ApiResponse { status, body })
    }
}
