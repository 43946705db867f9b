#![cfg(feature = "client")]

use std::io::Write;

use httpmock::prelude::*;
use serde_json::{json, Value};
use sharpapi_workflows::{Client, Config, Error, FileSet, Params};

fn params_from(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn client_for(server: &MockServer) -> Client {
    Client::new(Config {
        base_url: Some(server.base_url()),
        api_key: Some("test-key".to_string()),
        ..Default::default()
    })
    .expect("client config is valid")
}

#[test]
fn missing_api_key_is_a_config_error() {
    let err = Client::new(Config::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn list_parses_workflows_and_pagination() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/custom")
                .query_param("page", "1")
                .query_param("per_page", "2")
                .header("authorization", "Bearer test-key");
            then.status(200).json_body(json!({
                "data": [
                    {"slug": "summarize", "name": "Summarize", "input_mode": "application/json"},
                    {"slug": "ocr", "name": "OCR", "input_mode": "multipart/form-data"},
                ],
                "meta": {"pagination": {"total": 5, "per_page": 2, "current_page": 1, "total_pages": 3}},
            }));
        })
        .await;

    let list = client_for(&server).workflows().list(1, 2).await.unwrap();

    mock.assert_async().await;
    assert_eq!(list.count(), 2);
    assert_eq!(list.workflows[0].slug, "summarize");
    assert_eq!(list.total, Some(5));
    assert_eq!(list.total_pages, Some(3));
}

#[tokio::test]
async fn describe_hits_the_network_once_then_serves_from_cache() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/custom/summarize");
            then.status(200).json_body(json!({
                "data": {
                    "type": "workflow",
                    "id": "wf_1",
                    "attributes": {
                        "slug": "summarize",
                        "name": "Summarize",
                        "input_mode": "application/json",
                        "params": [
                            {"key": "text", "type": "json_string", "required": true},
                        ],
                    },
                },
            }));
        })
        .await;

    let workflows = client_for(&server).workflows();
    let first = workflows.describe("summarize").await.unwrap();
    let second = workflows.describe("summarize").await.unwrap();
    mock.assert_hits_async(1).await;
    assert_eq!(first.slug, "summarize");
    assert_eq!(first.params.len(), 1);
    assert_eq!(first, second);

    workflows.clear_describe_cache(Some("summarize"));
    workflows.describe("summarize").await.unwrap();
    mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn describe_unknown_slug_maps_to_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/custom/nope");
            then.status(404)
                .json_body(json!({"message": "Workflow not found"}));
        })
        .await;

    let err = client_for(&server)
        .workflows()
        .describe("nope")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { slug } if slug == "nope"));
}

#[tokio::test]
async fn execute_posts_json_and_returns_status_url() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/custom/summarize")
                .header("authorization", "Bearer test-key")
                .json_body(json!({"text": "hello"}));
            then.status(202).json_body(json!({
                "status_url": "https://sharpapi.com/api/v1/custom/job/42/status",
            }));
        })
        .await;

    let status_url = client_for(&server)
        .workflows()
        .execute("summarize", &params_from(json!({"text": "hello"})), &FileSet::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(status_url, "https://sharpapi.com/api/v1/custom/job/42/status");
}

#[tokio::test]
async fn execute_falls_back_to_the_location_header() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/custom/summarize");
            then.status(202)
                .header("location", "https://sharpapi.com/api/v1/custom/job/7/status");
        })
        .await;

    let status_url = client_for(&server)
        .workflows()
        .execute("summarize", &Params::new(), &FileSet::new())
        .await
        .unwrap();
    assert_eq!(status_url, "https://sharpapi.com/api/v1/custom/job/7/status");
}

#[tokio::test]
async fn execute_streams_files_as_multipart() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"scan-bytes").unwrap();

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/custom/ocr")
                .body_contains("name=\"document\"")
                .body_contains("scan-bytes")
                .body_contains("name=\"language\"");
            then.status(202).json_body(json!({
                "status_url": "https://sharpapi.com/api/v1/custom/job/9/status",
            }));
        })
        .await;

    let files = FileSet::new().with("document", tmp.path());
    client_for(&server)
        .workflows()
        .execute("ocr", &params_from(json!({"language": "en"})), &files)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn validation_failure_aborts_before_any_post() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/custom/summarize");
            then.status(200).json_body(json!({
                "data": {
                    "slug": "summarize",
                    "name": "Summarize",
                    "input_mode": "application/json",
                    "params": [{"key": "text", "type": "json_string", "required": true}],
                },
            }));
        })
        .await;
    let post_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/custom/summarize");
            then.status(202).json_body(json!({"status_url": "unreachable"}));
        })
        .await;

    let err = client_for(&server)
        .workflows()
        .validate_and_execute("summarize", &Params::new(), &FileSet::new())
        .await
        .unwrap_err();

    let report = err.validation_report().expect("validation failure");
    assert_eq!(report.get("text"), Some(&["Field is required".to_string()][..]));
    assert_eq!(post_mock.hits_async().await, 0);
}

#[tokio::test]
async fn non_2xx_surfaces_as_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/custom/summarize");
            then.status(422)
                .json_body(json!({"message": "The given data was invalid."}));
        })
        .await;

    let err = client_for(&server)
        .workflows()
        .execute("summarize", &Params::new(), &FileSet::new())
        .await
        .unwrap_err();

    match err {
        Error::Api(api) => {
            assert_eq!(api.status, 422);
            assert_eq!(api.message, "The given data was invalid.");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}
