//! Replayable request descriptors and the network seam under the client.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{multipart, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiError;

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One piece of a multipart form. Kept as owned data so the same form can
/// be rebuilt for a retry.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// Everything needed to (re)send a request to the marketplace API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode request body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }
}

/// Whether a request is on its first send or its single post-refresh retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

/// A request travelling through the refresh-and-retry path. The attempt
/// marker travels with the descriptor instead of living on shared state.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request: ApiRequest,
    pub attempt: Attempt,
}

impl PendingRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            attempt: Attempt::First,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.attempt == Attempt::Retry
    }

    pub fn into_retry(self) -> Self {
        Self {
            request: self.request,
            attempt: Attempt::Retry,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turn non-2xx responses into the matching `ApiError`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.text()))
        }
    }
}

/// The network seam: sends one request, attaching `bearer` when given.
///
/// Returns `Err` only when no response arrived at all; every HTTP status,
/// including 401, comes back as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError>;
}

/// `Transport` over a pooled `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_form(parts: &[FormPart]) -> Result<multipart::Form, ApiError> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file = multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime)
                        .map_err(|e| ApiError::InvalidRequest(format!("Invalid MIME type {}: {}", mime, e)))?;
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
