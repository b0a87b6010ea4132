//! REST API client module for the marketplace service.
//!
//! This module provides the `ApiClient` for browsing, selling and buying
//! listings. Requests carry the session's access token as a bearer
//! credential; expired tokens are renewed through the session's refresh
//! protocol and the request is retried once.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, ErrorBody};
pub use transport::{ApiRequest, ApiResponse, FormPart, ReqwestTransport, RequestBody, Transport};
