mod helpers;

use cutout_providers::test_helpers::EchoProvider;
use helpers::{image_form, jpeg_bytes, setup_test_app_with, TestApp};
use std::sync::Arc;
use std::time::Duration;

const LIMITS: &[(&str, &str)] = &[
    ("RATE_LIMIT_MAX_REQUESTS", "3"),
    ("RATE_LIMIT_WINDOW_SECS", "1"),
];

async fn upload_from(app: &TestApp, ip: &str) -> axum_test::TestResponse {
    app.server
        .post("/api/remove-bg")
        .add_header("x-forwarded-for", ip)
        .multipart(image_form(jpeg_bytes(512), "a.jpg", "image/jpeg"))
        .await
}

#[tokio::test]
async fn excess_requests_get_429_without_provider_call() {
    let echo = EchoProvider::new();
    let app = setup_test_app_with(Arc::new(echo.clone()), LIMITS);

    for expected_remaining in ["2", "1", "0"] {
        let response = upload_from(&app, "192.0.2.10").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.headers()["x-ratelimit-limit"], "3");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            expected_remaining
        );
    }

    let response = upload_from(&app, "192.0.2.10").await;
    assert_eq!(response.status_code(), 429);
    assert!(response.headers().contains_key("retry-after"));
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "Too many requests, please try again later.");
    assert_eq!(data["code"], "rate-limited");

    assert_eq!(echo.calls.get(), 3);
}

#[tokio::test]
async fn other_clients_are_not_affected() {
    let echo = EchoProvider::new();
    let app = setup_test_app_with(Arc::new(echo.clone()), LIMITS);

    for _ in 0..3 {
        upload_from(&app, "192.0.2.10").await;
    }
    assert_eq!(upload_from(&app, "192.0.2.10").await.status_code(), 429);

    let response = upload_from(&app, "192.0.2.20").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "2");
}

#[tokio::test]
async fn client_recovers_after_window() {
    let app = setup_test_app_with(Arc::new(EchoProvider::new()), LIMITS);

    for _ in 0..3 {
        upload_from(&app, "192.0.2.30").await;
    }
    assert_eq!(upload_from(&app, "192.0.2.30").await.status_code(), 429);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(upload_from(&app, "192.0.2.30").await.status_code(), 200);
}

#[tokio::test]
async fn rejected_uploads_still_count_against_the_limit() {
    let echo = EchoProvider::new();
    let app = setup_test_app_with(Arc::new(echo.clone()), LIMITS);

    for _ in 0..3 {
        let response = app
            .server
            .post("/api/remove-bg")
            .add_header("x-forwarded-for", "192.0.2.40")
            .multipart(image_form(vec![0u8; 64], "a.gif", "image/gif"))
            .await;
        assert_eq!(response.status_code(), 400);
    }

    assert_eq!(upload_from(&app, "192.0.2.40").await.status_code(), 429);
    assert_eq!(echo.calls.get(), 0);
}

#[tokio::test]
async fn health_check_is_never_limited() {
    let app = setup_test_app_with(Arc::new(EchoProvider::new()), LIMITS);

    for _ in 0..10 {
        let response = app
            .server
            .get("/")
            .add_header("x-forwarded-for", "192.0.2.50")
            .await;
        assert_eq!(response.status_code(), 200);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn wrong_method_does_not_consume_quota() {
    let app = setup_test_app_with(Arc::new(EchoProvider::new()), LIMITS);

    for _ in 0..5 {
        let response = app
            .server
            .get("/api/remove-bg")
            .add_header("x-forwarded-for", "192.0.2.60")
            .await;
        assert_eq!(response.status_code(), 404);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }

    let response = upload_from(&app, "192.0.2.60").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "2");
}
