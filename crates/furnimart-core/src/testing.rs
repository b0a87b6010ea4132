//! Test doubles shared by the unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::api::transport::{ApiRequest, ApiResponse, RequestBody, Transport};
use crate::api::ApiError;
use crate::auth::session::{Navigator, Route};

/// Simulated round trip. Long enough that every caller polled in the same
/// `join!` has sent its request before the first response arrives.
const LATENCY: Duration = Duration::from_millis(20);

type Handler = dyn Fn(&ApiRequest, Option<&str>) -> Result<ApiResponse, ApiError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl RecordedCall {
    pub fn json_body(&self) -> Option<Value> {
        match &self.body {
            RequestBody::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Transport that answers from a closure and records every call.
/// Each send waits `LATENCY` so concurrent callers interleave.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest, Option<&str>) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn json(status: StatusCode, body: Value) -> ApiResponse {
        ApiResponse::new(status, body.to_string())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        tokio::time::sleep(LATENCY).await;
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
        });
        (self.handler)(request, bearer)
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}
