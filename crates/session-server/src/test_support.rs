//! Helpers shared by handler tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chess_session::store::MemoryStore;
use chess_session::SessionConfig;
use chess_strategies::{StrategyConfig, StrategyRegistry, RANDOM_PROFILE};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::AppState;

/// State over an in-memory store with a seeded random profile.
pub fn test_state() -> AppState {
    let registry = StrategyRegistry::new([(
        RANDOM_PROFILE.to_string(),
        StrategyConfig::Random { seed: Some(11) },
    )]);
    AppState::new(
        Arc::new(MemoryStore::new()),
        registry,
        SessionConfig::default(),
    )
}

/// Sends one request and returns the status and the JSON body (`null` if
/// the body is empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(json) => request.body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
