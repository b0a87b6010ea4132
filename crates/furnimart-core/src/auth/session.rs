use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::store::{Credentials, TokenStore};
use crate::api::transport::{ApiRequest, Transport};

/// Token refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// Whether the user is signed in, as seen by views and guards.
///
/// A refresh in progress is not a separate observable state; the session
/// stays `LoggedIn` until the refresh fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

/// Navigation targets the session layer can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login { return_to: Option<String> },
}

impl Route {
    pub fn path(&self) -> &str {
        match self {
            Route::Home => "/",
            Route::Login { .. } => "/login",
        }
    }
}

/// Receives navigation side effects (logout redirect, forced logout).
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for contexts with nowhere to go.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        debug!(path = route.path(), "Navigation requested with no navigator attached");
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Network error during refresh: {0}")]
    Network(String),

    #[error("Malformed refresh response: {0}")]
    Malformed(String),

    /// The session was logged out or replaced while the refresh was in
    /// flight. The new token is discarded and the current session is left
    /// as it is.
    #[error("Session changed during refresh")]
    Superseded,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

struct SessionInner {
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
    in_flight: Mutex<Option<RefreshFuture>>,
}

/// Owns login/logout transitions and the token refresh protocol.
///
/// Clone is cheap; all clones share the same state and in-flight refresh.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// Build a session over an existing store. The initial state is
    /// `LoggedIn` iff the store holds both tokens; no network call is made.
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let initial = if store.has_credentials() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        };
        debug!(?initial, "Session initialized from token store");

        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner {
                store,
                transport,
                navigator,
                state,
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state() == SessionState::LoggedIn
    }

    /// Watch session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.store.access()
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.store.user_id()
    }

    pub fn navigate(&self, route: Route) {
        self.inner.navigator.navigate(route);
    }

    /// Record freshly issued credentials and mark the session signed in.
    pub fn login(&self, credentials: &Credentials) {
        self.inner.store.set(credentials);
        self.inner.state.send_replace(SessionState::LoggedIn);
        info!(user_id = %credentials.user_id, "Logged in");
    }

    /// Clear credentials and navigate to `/login` (`redirect`) or `/`.
    /// Safe to call when already logged out.
    pub fn logout(&self, redirect: bool) {
        self.inner.store.clear();
        let previous = self.inner.state.send_replace(SessionState::LoggedOut);
        if previous == SessionState::LoggedIn {
            info!("Logged out");
        }
        let route = if redirect {
            Route::Login { return_to: None }
        } else {
            Route::Home
        };
        self.inner.navigator.navigate(route);
    }

    /// True while a refresh call is outstanding.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().await.is_some()
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Concurrent callers share one in-flight refresh: only the first starts
    /// a network call, the rest await its result. On success only the access
    /// token is replaced, and only if the store still holds the refresh token
    /// that was sent; otherwise `Superseded` is returned and nothing changes.
    /// On any other failure the store is cleared, the session transitions to
    /// `LoggedOut` and navigation goes to the login view before the error is
    /// returned. Never retries on its own.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let refresh = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let result = inner.refresh_once().await;
                        inner.in_flight.lock().await.take();
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        refresh.await
    }
}

impl SessionInner {
    async fn refresh_once(&self) -> Result<String, RefreshError> {
        let refresh = match self.store.refresh() {
            Some(refresh) => refresh,
            None => {
                warn!("No refresh token, forcing logout");
                self.force_logout();
                return Err(RefreshError::NoRefreshToken);
            }
        };

        match self.request_new_access(&refresh).await {
            Ok(access) => {
                if !self.store.replace_access(&refresh, &access) {
                    debug!("Session changed during refresh, discarding new access token");
                    return Err(RefreshError::Superseded);
                }
                info!("Access token refreshed");
                Ok(access)
            }
            // A failure for a session that is already gone must not clear its successor
            Err(e) if self.store.refresh().as_deref() != Some(refresh.as_str()) => {
                debug!(error = %e, "Refresh failed for a session that no longer exists");
                Err(RefreshError::Superseded)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, forcing logout");
                self.force_logout();
                Err(e)
            }
        }
    }

    async fn request_new_access(&self, refresh: &str) -> Result<String, RefreshError> {

        let request = ApiRequest::post(REFRESH_PATH)
            .json(&RefreshRequest { refresh })
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;

        let response = self
            .transport
            .send(&request, None)
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        if !response.status.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status.as_u16(),
            });
        }

        let body: RefreshResponse = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;
        if body.access.is_empty() {
            return Err(RefreshError::Malformed("empty access token".to_string()));
        }
        Ok(body.access)
    }

    fn force_logout(&self) {
        self.store.clear();
        self.state.send_replace(SessionState::LoggedOut);
        self.navigator.navigate(Route::Login { return_to: None });
    }
}
