//! Tests for `PlatformClient` against a mocked platform backend.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feddash::api::{ApiError, CachedCatalog, DatasetCatalog, PlatformClient, SessionCreator};
use feddash::wizard::FieldMap;

/// Client pointed at the mock server with fast retries
fn client_for(server: &MockServer, token: Option<&str>) -> PlatformClient {
    PlatformClient::new(&server.uri(), token.map(String::from), Duration::from_secs(5))
        .unwrap()
        .with_retry_config(2, Duration::from_millis(10), Duration::from_millis(20))
}

fn stats_body() -> serde_json::Value {
    json!({
        "data": {
            "filename": "train.csv",
            "columns": ["patient_id", "age", "outcome"],
            "num_rows": 120,
            "identifier_columns": ["patient_id"]
        }
    })
}

#[tokio::test]
async fn test_list_datasets_reads_envelope_and_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"datasets": [{"id": "ds-1", "filename": "train.csv", "num_rows": 10}]},
            "message": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let datasets = client_for(&server, Some("secret"))
        .list_datasets()
        .await
        .unwrap();

    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].id, "ds-1");
}

#[tokio::test]
async fn test_missing_payload_becomes_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/ds-1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "none"})))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = client_for(&server, None).list_tasks("ds-1").await.unwrap();

    assert!(tasks.is_empty());
}

#[tokio::test]
async fn test_reads_retry_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/train.csv/stats"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "warming up"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/train.csv/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stats_body()))
        .expect(1)
        .mount(&server)
        .await;

    let stats = client_for(&server, None)
        .dataset_stats("train.csv")
        .await
        .unwrap();

    assert_eq!(stats.columns, vec!["patient_id", "age", "outcome"]);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/gone.csv/stats"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no such file"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .dataset_stats("gone.csv")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound { .. }));
}

#[tokio::test]
async fn test_session_creation_posts_fields_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .and(body_partial_json(json!({"organisation_name": "north-clinic"})))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "orchestrator busy"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let fields: FieldMap = json!({"organisation_name": "north-clinic"})
        .as_object()
        .cloned()
        .unwrap();

    let err = client_for(&server, None)
        .create_session(&fields)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::HttpError {
            service: "sessions".to_string(),
            status: 503,
            message: "orchestrator busy".to_string(),
        }
    );
}

#[tokio::test]
async fn test_session_creation_returns_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"session_id": "s-9", "status": "queued"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server, None)
        .create_session(&FieldMap::new())
        .await
        .unwrap();

    assert_eq!(response.session_id, "s-9");
    assert_eq!(response.status.as_deref(), Some("queued"));
}

#[tokio::test]
async fn test_session_response_without_data_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "accepted"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .create_session(&FieldMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::ParseError { .. }));
}

#[tokio::test]
async fn test_cached_catalog_fetches_stats_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/train.csv/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stats_body()))
        .expect(1)
        .mount(&server)
        .await;
    let catalog = CachedCatalog::new(client_for(&server, None), Duration::from_secs(60));

    let first = catalog.dataset_stats("train.csv").await.unwrap();
    let second = catalog.dataset_stats("train.csv").await.unwrap();

    assert_eq!(first, second);
}
