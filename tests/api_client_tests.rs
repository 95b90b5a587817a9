// Integration tests for the HTTP adapter

mod common;

use common::FakeBackend;
use media_organizer::endpoints::Endpoint;
use media_organizer::models::{ScanResponse, Settings};
use media_organizer::{ApiClient, ClientConfig, ClientError, Timeout};
use serde_json::{Value, json};

#[tokio::test]
async fn test_sends_json_content_type_and_custom_headers() {
    let backend = FakeBackend::start().await;
    backend.reply("GET", "/api/config", 200, json!({"media_libraries": []}));

    let mut config = ClientConfig::default().with_base_url(backend.base_url.clone());
    config.headers.insert("X-Api-Key".to_string(), "secret".to_string());
    let client = ApiClient::new(&config).unwrap();

    let _: Settings = client.get_json(Endpoint::GetConfig, &[]).await.unwrap();

    let sent = backend.requests_to("GET", "/api/config");
    assert_eq!(sent[0].headers.get("content-type").unwrap(), "application/json");
    assert_eq!(sent[0].headers.get("x-api-key").unwrap(), "secret");
}

#[tokio::test]
async fn test_non_success_status_carries_detail() {
    let backend = FakeBackend::start().await;
    backend.reply("GET", "/api/files/directories", 404, json!({"detail": "Directory not found"}));

    let err = backend
        .client()
        .get_json::<Value>(Endpoint::Directories, &[("path", "/missing")])
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, detail } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(detail.as_deref(), Some("Directory not found"));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_a_decode_error() {
    let backend = FakeBackend::start().await;
    backend.reply_raw("GET", "/api/files/scan", 200, "<html>proxy error</html>");

    let err = backend
        .client()
        .get_json::<ScanResponse>(Endpoint::Scan, &[("full_scan", "false")])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_optional_post_treats_null_as_absent() {
    let backend = FakeBackend::start().await;
    backend.reply("POST", "/api/config", 200, Value::Null);

    let saved: Option<Settings> = backend
        .client()
        .post_json_optional(Endpoint::UpdateConfig, &Settings::default())
        .await
        .unwrap();
    assert!(saved.is_none());
}

#[tokio::test]
async fn test_discard_ignores_response_body() {
    let backend = FakeBackend::start().await;
    backend.reply_raw("POST", "/api/config/test", 200, "not json at all");

    backend
        .client()
        .post_discard(Endpoint::TestConfig, &Settings::default())
        .await
        .unwrap();
    assert_eq!(backend.requests_to("POST", "/api/config/test").len(), 1);
}

#[tokio::test]
async fn test_bounded_timeout_still_reaches_backend() {
    let backend = FakeBackend::start().await;
    backend.reply("GET", "/api/files/scan", 200, json!({"files": ["/lib/A.mkv"]}));

    let config = ClientConfig::default()
        .with_base_url(backend.base_url.clone())
        .with_timeout(Timeout::Seconds(10));
    let client = ApiClient::new(&config).unwrap();

    let response: ScanResponse = client.get_json(Endpoint::Scan, &[("full_scan", "false")]).await.unwrap();
    assert_eq!(response.files, Some(vec!["/lib/A.mkv".to_string()]));
}
