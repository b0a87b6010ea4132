//! Core library for the furnimart marketplace client.
//!
//! - [`auth`]: token storage, session lifecycle, silent refresh, route guard
//! - [`api`]: the single gateway to the REST API, with refresh-on-401
//! - [`models`]: listings and account payloads
//! - [`config`]: API URL selection and token storage choice

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

pub use api::{ApiClient, ApiError, ErrorBody};
pub use auth::{
    Credentials, GuardState, Navigator, RefreshError, Route, RouteGuard, SessionManager, SessionState,
    TokenStore,
};
pub use config::{Config, Mode, TokenStorage};

/// Wire up the token store, transport and session described by `config`.
pub fn build_client(config: &Config, navigator: Arc<dyn Navigator>) -> Result<ApiClient> {
    let base_url = config.api_base_url()?;
    debug!(%base_url, storage = ?config.token_storage, "Building API client");

    let transport = Arc::new(api::ReqwestTransport::new(&base_url)?);
    let store = config.token_store()?;
    let session = SessionManager::new(store, transport, navigator);
    Ok(ApiClient::new(session))
}
