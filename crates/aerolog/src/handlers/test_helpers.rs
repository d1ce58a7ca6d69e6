//! shared test helpers for handler tests

use aerolog_db::AerologDb;
use aerolog_types::Config;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

/// build an app backed by a fresh in-memory database.
pub async fn test_app() -> Router {
    test_app_with_config(Config::default()).await
}

/// build an app with a specific config (e.g. ingest.allow_unverified).
pub async fn test_app_with_config(config: Config) -> Router {
    let db = AerologDb::new_in_memory().await.unwrap();
    crate::create_app(db, config)
}

/// send a json POST and return (status, parsed body).
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// send a json POST with extra headers and return (status, parsed body).
pub async fn post_json_with_headers(
    app: &Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    send(app, request).await
}

/// send a GET and return (status, parsed body).
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, body)
}

/// register a user and return their id.
pub async fn seed_user(app: &Router, username: &str) -> u64 {
    let (status, body) = post_json(
        app,
        "/register",
        serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct horse battery staple",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "seed_user failed: {}", body);
    body["data"]["id"].as_u64().unwrap()
}
