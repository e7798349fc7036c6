//! REST API layer for the medbook backend.
//!
//! Requests are plain [`ApiRequest`] values sent through a [`Transport`].
//! Authentication and token refresh live in `auth::AuthenticatedSession`;
//! [`MedbookClient`] adds typed endpoints on top of it.

pub mod client;
pub mod error;
pub mod request;
pub mod transport;

pub use client::MedbookClient;
pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse};
pub use transport::{ReqwestTransport, Transport, TransportError, DEFAULT_TIMEOUT_SECS};
