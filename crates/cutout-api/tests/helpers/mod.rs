//! Test helpers: build AppState and router around a stub provider.
//!
//! Run from workspace root: `cargo test -p cutout-api`.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use cutout_api::setup::routes;
use cutout_api::AppState;
use cutout_core::Config;
use cutout_providers::BackgroundRemover;
use std::collections::HashMap;
use std::sync::Arc;

pub const MB: usize = 1024 * 1024;

/// Test application: server plus the state behind it.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

/// Configuration as the server would read it, with `overrides` applied on top of a
/// valid baseline.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("ENVIRONMENT", "test"),
        ("PROVIDER", "replicate"),
        ("REPLICATE_API_TOKEN", "r8_test_token_123456"),
        ("PROVIDER_TIMEOUT_SECS", "5"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

pub fn setup_test_app(provider: Arc<dyn BackgroundRemover>) -> TestApp {
    setup_test_app_with(provider, &[])
}

pub fn setup_test_app_with(
    provider: Arc<dyn BackgroundRemover>,
    overrides: &[(&str, &str)],
) -> TestApp {
    let state = AppState::new(test_config(overrides), provider);
    let app = routes::setup_routes(state.clone()).expect("Failed to build router");
    let server = TestServer::new(app).expect("Failed to create test server");
    TestApp { server, state }
}

/// JPEG-looking payload of exactly `size` bytes.
pub fn jpeg_bytes(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    data[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
    data
}

/// PNG-looking payload of exactly `size` bytes.
pub fn png_bytes(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    data[..8].copy_from_slice(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    data
}

/// Multipart body with the image under the `file` field.
pub fn image_form(data: Vec<u8>, filename: &str, mime: &str) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(data))
        .file_name(filename.to_string())
        .mime_type(mime.to_string());
    MultipartForm::new().add_part("file", part)
}
