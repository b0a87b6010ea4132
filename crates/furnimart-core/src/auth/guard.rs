use chrono::{DateTime, Utc};
use tracing::debug;

use super::claims;
use super::session::{RefreshError, Route, SessionManager};

/// Outcome of a guarded navigation. Starts `Unknown`; views render a
/// neutral placeholder until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unknown,
    Authorized,
    Unauthorized,
}

impl GuardState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, GuardState::Unknown)
    }
}

/// Gate in front of a protected view.
///
/// Create one per navigation. `resolve` performs the check once; later calls
/// return the settled state without touching the network.
pub struct RouteGuard {
    session: SessionManager,
    destination: String,
    state: GuardState,
}

impl RouteGuard {
    pub fn new(session: SessionManager, destination: impl Into<String>) -> Self {
        Self {
            session,
            destination: destination.into(),
            state: GuardState::Unknown,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub async fn resolve(&mut self) -> GuardState {
        self.resolve_at(Utc::now()).await
    }

    /// Resolve against an explicit clock.
    ///
    /// A signed-in session with an unexpired access token is authorized
    /// immediately. Otherwise a silent refresh decides. Unauthorized
    /// navigations redirect to login, remembering the destination.
    pub async fn resolve_at(&mut self, now: DateTime<Utc>) -> GuardState {
        if self.state.is_resolved() {
            return self.state;
        }

        self.state = if self.has_valid_session(now) {
            GuardState::Authorized
        } else {
            debug!(destination = %self.destination, "Access token missing or expired, refreshing");
            match self.session.refresh().await {
                Ok(_) => GuardState::Authorized,
                // Someone signed in while the refresh ran; judge the new session
                Err(RefreshError::Superseded) if self.has_valid_session(now) => GuardState::Authorized,
                Err(_) => GuardState::Unauthorized,
            }
        };

        if self.state == GuardState::Unauthorized {
            self.session.navigate(Route::Login {
                return_to: Some(self.destination.clone()),
            });
        }
        debug!(destination = %self.destination, state = ?self.state, "Route guard resolved");
        self.state
    }

    fn has_valid_session(&self, now: DateTime<Utc>) -> bool {
        self.session.is_logged_in()
            && self
                .session
                .access_token()
                .map(|t| !claims::is_expired(&t, now))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::make_token;
    use crate::auth::store::{Credentials, MemoryTokenStore};
    use crate::testing::{RecordingNavigator, ScriptedTransport};
    use chrono::TimeZone;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).unwrap()
    }

    fn guard_with(
        store: MemoryTokenStore,
        refresh_status: StatusCode,
    ) -> (RouteGuard, Arc<ScriptedTransport>, Arc<RecordingNavigator>) {
        let fresh = make_token(&json!({"exp": NOW + 300, "user_id": 42}));
        let transport = Arc::new(ScriptedTransport::new(move |_, _| {
            Ok(ScriptedTransport::json(refresh_status, json!({"access": fresh})))
        }));
        let navigator = Arc::new(RecordingNavigator::default());
        let session = SessionManager::new(Arc::new(store), transport.clone(), navigator.clone());
        (RouteGuard::new(session, "/mypage"), transport, navigator)
    }

    #[tokio::test]
    async fn test_valid_token_authorizes_without_refresh() {
        let access = make_token(&json!({"exp": NOW + 60}));
        let store = MemoryTokenStore::with_credentials(&Credentials::new(access, "R1", "42"));
        let (mut guard, transport, navigator) = guard_with(store, StatusCode::OK);

        assert_eq!(guard.state(), GuardState::Unknown);
        assert_eq!(guard.resolve_at(now()).await, GuardState::Authorized);
        assert_eq!(transport.call_count(), 0);
        assert!(navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once() {
        let access = make_token(&json!({"exp": NOW - 1}));
        let store = MemoryTokenStore::with_credentials(&Credentials::new(access, "R1", "42"));
        let (mut guard, transport, _) = guard_with(store, StatusCode::OK);

        assert_eq!(guard.resolve_at(now()).await, GuardState::Authorized);
        assert_eq!(transport.call_count(), 1);

        // Settled: no second check for the same mount
        assert_eq!(guard.resolve_at(now()).await, GuardState::Authorized);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_access_token_refreshes() {
        let store = MemoryTokenStore::with_credentials(&Credentials::new("opaque", "R1", "42"));
        let (mut guard, transport, _) = guard_with(store, StatusCode::OK);

        assert_eq!(guard.resolve_at(now()).await, GuardState::Authorized);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_redirects_with_destination() {
        let access = make_token(&json!({"exp": NOW - 600}));
        let store = MemoryTokenStore::with_credentials(&Credentials::new(access, "R1", "42"));
        let (mut guard, transport, navigator) = guard_with(store, StatusCode::UNAUTHORIZED);

        assert_eq!(guard.resolve_at(now()).await, GuardState::Unauthorized);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(
            navigator.routes().last(),
            Some(&Route::Login {
                return_to: Some("/mypage".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_logged_out_without_refresh_token_is_unauthorized() {
        let (mut guard, transport, _) = guard_with(MemoryTokenStore::new(), StatusCode::OK);

        assert_eq!(guard.resolve_at(now()).await, GuardState::Unauthorized);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_login_during_refresh_authorizes_new_session() {
        let expired = make_token(&json!({"exp": NOW - 1}));
        let store = MemoryTokenStore::with_credentials(&Credentials::new(expired, "R1", "42"));
        let (mut guard, _, navigator) = guard_with(store, StatusCode::OK);
        let session = guard.session.clone();

        let fresh = make_token(&json!({"exp": NOW + 600}));
        let (state, _) = tokio::join!(guard.resolve_at(now()), async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            session.login(&Credentials::new(fresh, "RB", "99"));
        });

        assert_eq!(state, GuardState::Authorized);
        assert_eq!(session.user_id().as_deref(), Some("99"));
        assert!(navigator.routes().is_empty());
    }
}
