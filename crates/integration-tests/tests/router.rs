//! Router-level tests that need no database.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};

use bizshop_integration_tests::{send, test_app};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_is_ok() {
    let (status, body) = send(test_app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    use tower::ServiceExt;

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-abc-123");

    let response = test_app().oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_plan_catalog_is_public_and_ordered() {
    let (status, body) = send(test_app(), get("/api/plans")).await;
    assert_eq!(status, StatusCode::OK);

    let plans = body.as_array().unwrap();
    let ids: Vec<&str> = plans.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["free", "basic", "pro", "premium", "lifetime"]);

    assert_eq!(plans[0]["priceInr"], 0);
    assert_eq!(plans[0]["billing"], "free");
    assert_eq!(plans[4]["billing"], "one_time");
    assert!(plans.iter().all(|p| p.get("features").is_some_and(Value::is_array)));
}

#[tokio::test]
async fn test_account_routes_require_login() {
    for uri in [
        "/api/me",
        "/api/me/features/custom_domain",
        "/api/invitations",
        "/api/stores",
        "/api/admin/stats",
        "/api/admin/users",
    ] {
        let (status, body) = send(test_app(), get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized", "{uri}");
    }
}

#[tokio::test]
async fn test_subscription_actions_require_login() {
    for uri in [
        "/api/subscriptions/free",
        "/api/subscriptions/pause",
        "/api/subscriptions/resume",
        "/api/subscriptions/cancel",
    ] {
        let (status, _) = send(test_app(), post_json(uri, &json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, _) = send(
        test_app(),
        post_json("/api/subscriptions/checkout", &json!({ "plan": "pro" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let (status, _) = send(test_app(), post_json("/api/auth/logout", &json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (status, _) = send(test_app(), get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
