use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use keyturn_api::auth::hasher::CredentialHasher;
use keyturn_api::auth::jwt::Signer;
use keyturn_api::auth::service::TokenService;
use keyturn_api::config::{JwtConfig, ServerConfig, StoreKind};
use keyturn_api::router::build_app_router;
use keyturn_api::state::AppState;
use keyturn_db::{MemorySessionStore, SessionBackend};
use keyturn_events::{AlertDispatcher, LogNotifier};
use tower::ServiceExt;

pub const TEST_KEY: &[u8] = b"integration-test-key-for-hs512-signing";

/// Address sent in `X-Forwarded-For` by the request helpers.
pub const CLIENT_IP: &str = "203.0.113.7";

/// Build a test `ServerConfig` with safe defaults over the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        store: StoreKind::Memory,
        jwt: JwtConfig {
            secret: TEST_KEY.to_vec(),
            access_ttl: Duration::from_secs(15 * 60),
        },
        alert_destination: "security@keyturn.local".to_string(),
        email: None,
    }
}

/// Build the full application router over a fresh in-memory store.
///
/// Returns the store as well so tests can inspect persisted sessions.
pub fn build_test_app() -> (Router, MemorySessionStore) {
    let config = test_config();
    let store = MemorySessionStore::new();

    let signer = Signer::new(config.jwt.access_ttl, &config.jwt.secret)
        .expect("test signer should build");
    let (alerts, _handle) = AlertDispatcher::spawn(Arc::new(LogNotifier));

    let tokens = TokenService::new(
        Arc::new(signer),
        CredentialHasher::default(),
        SessionBackend::Memory(store.clone()),
        alerts,
        config.alert_destination.clone(),
    );
    let state = AppState {
        tokens: Arc::new(tokens),
    };

    (build_app_router(state, &config), store)
}

/// Send a GET request from [`CLIENT_IP`].
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body from [`CLIENT_IP`].
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_json_from(app, uri, body, Some(CLIENT_IP)).await
}

/// Send a POST request with a JSON body, forwarded for `ip` if given.
///
/// Requests built here carry no peer address, so `None` leaves the client
/// address unresolvable.
pub async fn post_json_from(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    ip: Option<&str>,
) -> Response<Body> {
    post_body(app, uri, body.to_string(), ip).await
}

/// Send a POST request with an arbitrary body labelled as JSON.
pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    post_body(app, uri, body, Some(CLIENT_IP)).await
}

async fn post_body(app: Router, uri: &str, body: String, ip: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(ip) = ip {
        builder = builder.header("x-forwarded-for", ip);
    }
    let request = builder.body(Body::from(body)).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
