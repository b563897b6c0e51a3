mod helpers;

use async_trait::async_trait;
use axum_test::multipart::MultipartForm;
use cutout_core::{FailureReason, ProviderFailure, ProviderOutput, ProviderResult, UploadedFile};
use cutout_providers::test_helpers::{EchoProvider, FailingProvider, SlowProvider};
use cutout_providers::BackgroundRemover;
use helpers::{image_form, jpeg_bytes, png_bytes, setup_test_app, setup_test_app_with, MB};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = setup_test_app(Arc::new(EchoProvider::new()));

    let response = app.server.get("/").await;
    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data, serde_json::json!({ "status": "OK" }));
}

#[tokio::test]
async fn two_megabyte_jpeg_returns_png() {
    let echo = EchoProvider::new();
    let app = setup_test_app(Arc::new(echo.clone()));

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(image_form(jpeg_bytes(2 * MB), "holiday.jpg", "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert!(!response.as_bytes().is_empty());

    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"removed-bg-"));
    assert!(disposition.ends_with(".png\""));
    assert_eq!(echo.calls.get(), 1);
}

#[tokio::test]
async fn echo_round_trip_is_byte_identical() {
    let app = setup_test_app(Arc::new(EchoProvider::new()));
    let input = png_bytes(64 * 1024);

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(image_form(input.clone(), "in.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.as_bytes().as_ref(), input.as_slice());
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let echo = EchoProvider::new();
    let app = setup_test_app(Arc::new(echo.clone()));

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(MultipartForm::new().add_text("note", "no image here"))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "No file uploaded");
    assert_eq!(echo.calls.get(), 0);
}

#[tokio::test]
async fn text_value_named_file_is_not_an_upload() {
    let echo = EchoProvider::new();
    let app = setup_test_app(Arc::new(echo.clone()));

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(MultipartForm::new().add_text("file", "not an upload"))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "No file uploaded");
    assert_eq!(echo.calls.get(), 0);
}

#[tokio::test]
async fn text_value_named_file_does_not_shadow_the_real_upload() {
    let echo = EchoProvider::new();
    let app = setup_test_app(Arc::new(echo.clone()));

    let input = jpeg_bytes(2048);
    let form = MultipartForm::new().add_text("file", "caption").add_part(
        "file",
        axum_test::multipart::Part::bytes(bytes::Bytes::from(input.clone()))
            .file_name("photo.jpg")
            .mime_type("image/jpeg"),
    );
    let response = app.server.post("/api/remove-bg").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.as_bytes().as_ref(), input.as_slice());
    assert_eq!(echo.calls.get(), 1);
}

#[tokio::test]
async fn non_multipart_body_counts_as_missing_file() {
    let app = setup_test_app(Arc::new(EchoProvider::new()));

    let response = app
        .server
        .post("/api/remove-bg")
        .json(&serde_json::json!({ "file": "not really" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "No file uploaded");
}

#[tokio::test]
async fn oversized_png_never_reaches_provider() {
    let echo = EchoProvider::new();
    let app = setup_test_app(Arc::new(echo.clone()));

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(image_form(png_bytes(12 * MB), "huge.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "too-large");
    assert_eq!(data["error"], "File too large. Maximum size is 10MB");
    assert_eq!(echo.calls.get(), 0);
}

#[tokio::test]
async fn unsupported_type_never_reaches_provider() {
    let echo = EchoProvider::new();
    let app = setup_test_app(Arc::new(echo.clone()));

    for (name, mime) in [
        ("anim.gif", "image/gif"),
        ("doc.pdf", "application/pdf"),
        ("logo.svg", "image/svg+xml"),
    ] {
        let response = app
            .server
            .post("/api/remove-bg")
            .multipart(image_form(vec![1u8; 128], name, mime))
            .await;

        assert_eq!(response.status_code(), 400, "{mime}");
        let data: serde_json::Value = response.json();
        assert_eq!(data["code"], "unsupported-type");
        assert_eq!(
            data["error"],
            "Invalid file type. Only JPEG, PNG, and WebP are allowed."
        );
    }
    assert_eq!(echo.calls.get(), 0);
}

#[tokio::test]
async fn body_over_transport_limit_is_payload_too_large() {
    let echo = EchoProvider::new();
    let app = setup_test_app_with(
        Arc::new(echo.clone()),
        &[("MAX_FILE_SIZE_MB", "1"), ("MAX_REQUEST_BODY_MB", "1")],
    );

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(image_form(png_bytes(2 * MB), "big.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), 413);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "too-large");
    assert_eq!(echo.calls.get(), 0);
}

#[tokio::test]
async fn provider_auth_failure_is_403() {
    let app = setup_test_app(Arc::new(FailingProvider::with_status(403)));

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(image_form(jpeg_bytes(1024), "a.jpg", "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), 403);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "Invalid API key");
    assert_eq!(data["code"], "auth-failure");
    assert_eq!(data["details"], "upstream answered 403");
}

#[tokio::test]
async fn provider_statuses_map_to_relay_statuses() {
    let cases = [
        (400, 400, "Invalid image format or corrupted file"),
        (402, 402, "API quota exceeded. Please check your plan or try again later"),
        (429, 429, "Rate limit exceeded. Please try again in a moment"),
        (500, 500, "AI processing error. Please try again"),
        (503, 503, "Service unavailable. Please try again later"),
        (418, 500, "Internal server error"),
    ];

    for (upstream, expected, message) in cases {
        let app = setup_test_app(Arc::new(FailingProvider::with_status(upstream)));

        let response = app
            .server
            .post("/api/remove-bg")
            .multipart(image_form(jpeg_bytes(1024), "a.jpg", "image/jpeg"))
            .await;

        assert_eq!(response.status_code(), expected, "upstream {upstream}");
        let data: serde_json::Value = response.json();
        assert_eq!(data["error"], message, "upstream {upstream}");
    }
}

#[tokio::test]
async fn slow_provider_times_out_with_504() {
    let slow = SlowProvider::new(Duration::from_secs(30));
    let app = setup_test_app_with(Arc::new(slow.clone()), &[("PROVIDER_TIMEOUT_SECS", "1")]);

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(image_form(jpeg_bytes(1024), "a.jpg", "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), 504);
    assert_eq!(response.headers()["content-type"], "application/json");
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "timeout");
    assert!(data["error"]
        .as_str()
        .unwrap()
        .starts_with("Request timeout"));
    assert_eq!(slow.calls.get(), 1);
}

#[tokio::test]
async fn provider_transport_timeout_is_also_504() {
    let app = setup_test_app(Arc::new(FailingProvider::new(FailureReason::Timeout)));

    let response = app
        .server
        .post("/api/remove-bg")
        .multipart(image_form(jpeg_bytes(1024), "a.jpg", "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), 504);
}

/// Fails uploads whose filename starts with `bad`, echoes everything else.
#[derive(Debug)]
struct SelectiveProvider;

#[async_trait]
impl BackgroundRemover for SelectiveProvider {
    fn name(&self) -> &str {
        "selective"
    }

    async fn remove_background(&self, file: &UploadedFile) -> ProviderResult {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if file.filename.starts_with("bad") {
            Err(ProviderFailure::from_status(500, "model crashed"))
        } else {
            Ok(ProviderOutput::new(file.data.clone(), "image/png"))
        }
    }
}

#[tokio::test]
async fn concurrent_requests_are_isolated() {
    let app = setup_test_app(Arc::new(SelectiveProvider));
    let good_input = jpeg_bytes(4096);

    let good = app
        .server
        .post("/api/remove-bg")
        .add_header("x-forwarded-for", "198.51.100.1")
        .multipart(image_form(good_input.clone(), "good.jpg", "image/jpeg"))
        .into_future();
    let bad = app
        .server
        .post("/api/remove-bg")
        .add_header("x-forwarded-for", "198.51.100.2")
        .multipart(image_form(jpeg_bytes(4096), "bad.jpg", "image/jpeg"))
        .into_future();

    let (good, bad) = tokio::join!(good, bad);

    assert_eq!(good.status_code(), 200);
    assert_eq!(good.as_bytes().as_ref(), good_input.as_slice());
    assert_eq!(bad.status_code(), 500);
    let data: serde_json::Value = bad.json();
    assert_eq!(data["error"], "AI processing error. Please try again");
}

#[tokio::test]
async fn many_concurrent_uploads_each_get_their_own_bytes() {
    let app = setup_test_app(Arc::new(EchoProvider::new()));

    let requests = (0u8..8).map(|i| {
        let mut body = png_bytes(1024);
        body[100] = i;
        let request = app
            .server
            .post("/api/remove-bg")
            .add_header("x-forwarded-for", format!("203.0.113.{}", i))
            .multipart(image_form(body.clone(), "p.png", "image/png"))
            .into_future();
        async move { (body, request.await) }
    });

    for (sent, response) in futures::future::join_all(requests).await {
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.as_bytes().as_ref(), sent.as_slice());
    }
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = setup_test_app(Arc::new(EchoProvider::new()));

    let response = app.server.get("/api/unknown").await;
    assert_eq!(response.status_code(), 404);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "Endpoint not found");

    let response = app.server.get("/nowhere").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn wrong_method_on_known_route_is_404_json() {
    let echo = EchoProvider::new();
    let app = setup_test_app(Arc::new(echo.clone()));

    let response = app.server.get("/api/remove-bg").await;
    assert_eq!(response.status_code(), 404);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "Endpoint not found");
    assert_eq!(data["code"], "not-found");

    let response = app.server.put("/api/remove-bg").await;
    assert_eq!(response.status_code(), 404);

    let response = app.server.post("/").await;
    assert_eq!(response.status_code(), 404);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "Endpoint not found");

    assert_eq!(echo.calls.get(), 0);
}

#[tokio::test]
async fn production_responses_omit_error_details() {
    let upload = || image_form(jpeg_bytes(1024), "a.jpg", "image/jpeg");

    let production = setup_test_app_with(
        Arc::new(FailingProvider::with_status(403)),
        &[("ENVIRONMENT", "production")],
    );
    let response = production.server.post("/api/remove-bg").multipart(upload()).await;
    assert_eq!(response.status_code(), 403);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "Invalid API key");
    assert_eq!(data["code"], "auth-failure");
    assert!(data.get("details").is_none());

    // A development app in the same process still shows them
    let development = setup_test_app_with(
        Arc::new(FailingProvider::with_status(403)),
        &[("ENVIRONMENT", "development")],
    );
    let response = development.server.post("/api/remove-bg").multipart(upload()).await;
    let data: serde_json::Value = response.json();
    assert_eq!(data["details"], "upstream answered 403");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = setup_test_app(Arc::new(EchoProvider::new()));

    let response = app
        .server
        .get("/")
        .add_header("x-request-id", "req-42")
        .await;

    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let app = setup_test_app(Arc::new(EchoProvider::new()));

    let response = app
        .server
        .get("/")
        .add_header("origin", "http://localhost:5173")
        .await;
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );

    let response = app
        .server
        .get("/")
        .add_header("origin", "https://evil.example")
        .await;
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn cors_wildcard_entry_admits_subdomains_only() {
    let app = setup_test_app_with(
        Arc::new(EchoProvider::new()),
        &[("CORS_ORIGINS", "*.vercel.app")],
    );

    let response = app
        .server
        .get("/")
        .add_header("origin", "https://x.vercel.app")
        .await;
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://x.vercel.app"
    );

    for origin in ["https://vercel.app.evil.com", "https://vercel.app"] {
        let response = app.server.get("/").add_header("origin", origin).await;
        assert!(
            response
                .headers()
                .get("access-control-allow-origin")
                .is_none(),
            "{origin} should be rejected"
        );
    }
}
