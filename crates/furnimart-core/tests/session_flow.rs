//! End-to-end session tests against a mock marketplace API served by axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use furnimart_core::api::ReqwestTransport;
use furnimart_core::auth::{MemoryTokenStore, NoopNavigator, TokenStore};
use furnimart_core::{ApiClient, Credentials, SessionManager, SessionState};

struct MockApi {
    /// Access token the API currently accepts; empty accepts nothing
    valid_access: Mutex<String>,
    refresh_succeeds: bool,
    refresh_calls: AtomicUsize,
    seen_auth: Mutex<Vec<Option<String>>>,
}

impl MockApi {
    fn new(refresh_succeeds: bool) -> Arc<Self> {
        Arc::new(Self {
            valid_access: Mutex::new(String::new()),
            refresh_succeeds,
            refresh_calls: AtomicUsize::new(0),
            seen_auth: Mutex::new(Vec::new()),
        })
    }
}

async fn refresh(State(api): State<Arc<MockApi>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if api.refresh_succeeds && body["refresh"] == "R1" {
        *api.valid_access.lock().unwrap() = "A2".to_string();
        (StatusCode::OK, Json(json!({"access": "A2"})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
    }
}

async fn purchases(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    api.seen_auth.lock().unwrap().push(auth.clone());

    let valid = api.valid_access.lock().unwrap().clone();
    if !valid.is_empty() && auth.as_deref() == Some(format!("Bearer {}", valid).as_str()) {
        (
            StatusCode::OK,
            Json(json!([{
                "id": 1,
                "title": "Walnut bookshelf",
                "description": "Five shelves",
                "price": "180.00",
                "created_at": "2024-06-01T12:00:00Z",
                "status": "completed",
                "category": "BOOKSHELF",
                "thumbnail": null
            }])),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Given token not valid for any token type"})),
        )
    }
}

async fn spawn_api(api: Arc<MockApi>) -> String {
    let app = Router::new()
        .route("/api/token/refresh/", post(refresh))
        .route("/api/purchases/", get(purchases))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn logged_in_client(base_url: &str) -> ApiClient {
    let transport = Arc::new(ReqwestTransport::new(base_url).unwrap());
    let session = SessionManager::new(Arc::new(MemoryTokenStore::new()), transport, Arc::new(NoopNavigator));
    session.login(&Credentials::new("A1", "R1", "42"));
    assert!(session.is_logged_in());
    ApiClient::new(session)
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_request_retried() {
    let api = MockApi::new(true);
    let base_url = spawn_api(api.clone()).await;
    let client = logged_in_client(&base_url);

    let purchases = client.fetch_purchases().await.unwrap();

    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].title, "Walnut bookshelf");
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *api.seen_auth.lock().unwrap(),
        vec![Some("Bearer A1".to_string()), Some("Bearer A2".to_string())]
    );

    let store = client.session().store();
    assert_eq!(store.access().as_deref(), Some("A2"));
    assert_eq!(store.refresh().as_deref(), Some("R1"));
    assert_eq!(store.user_id().as_deref(), Some("42"));
    assert_eq!(client.session().state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn rejected_refresh_clears_session_and_returns_original_401() {
    let api = MockApi::new(false);
    let base_url = spawn_api(api.clone()).await;
    let client = logged_in_client(&base_url);
    let state = client.session().subscribe();

    let err = client.fetch_purchases().await.unwrap_err();

    assert!(err.is_unauthorized(), "expected Unauthorized, got {:?}", err);
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.seen_auth.lock().unwrap().len(), 1);

    let store = client.session().store();
    assert_eq!(store.access(), None);
    assert_eq!(store.refresh(), None);
    assert_eq!(store.user_id(), None);
    assert_eq!(*state.borrow(), SessionState::LoggedOut);
}

#[tokio::test]
async fn unreachable_api_is_a_network_error() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = logged_in_client(&format!("http://{}", addr));
    let err = client.fetch_purchases().await.unwrap_err();

    assert!(matches!(err, furnimart_core::ApiError::Network(_)), "got {:?}", err);
    assert!(client.session().is_logged_in());
}
