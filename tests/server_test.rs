//! HTTP transport tests
//!
//! Boots the router on an ephemeral port and exercises the thin CRUD
//! surface plus run triggering with reqwest. Model and render clients
//! point at unroutable endpoints; the analyze tests only need the
//! structural failure paths, which never reach the network.

use std::sync::Arc;

use serde_json::{json, Value};

use caseline::config::{
    ImagingConfig, ModelConfig, PipeConfig, PipelineConfig, RequestConfig,
};
use caseline::frames::FfmpegExtractor;
use caseline::imaging::HttpRenderClient;
use caseline::model::HttpReasoningClient;
use caseline::pipeline::Orchestrator;
use caseline::progress::RunRegistry;
use caseline::server::{build_router, AppState};
use caseline::storage::{EvidenceStore, SqliteStore};

async fn spawn_server() -> (String, Arc<SqliteStore>) {
    spawn_server_with(RequestConfig {
        timeout_ms: 1000,
        max_retries: 0,
        retry_delay_ms: 10,
    })
    .await
}

async fn spawn_server_with(request: RequestConfig) -> (String, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::new_in_memory().await.expect("store"));
    let model_config = ModelConfig {
        api_key: "test".to_string(),
        base_url: "http://127.0.0.1:1".to_string(),
        pipes: PipeConfig {
            summarize: "s".to_string(),
            transcribe: "t".to_string(),
            fusion: "f".to_string(),
            contradiction: "c".to_string(),
            scenario: "sc".to_string(),
        },
    };
    let imaging_config = ImagingConfig {
        api_key: String::new(),
        base_url: "http://127.0.0.1:1".to_string(),
    };

    let model = Arc::new(HttpReasoningClient::new(&model_config, request.clone()).unwrap());
    let render = Arc::new(HttpRenderClient::new(&imaging_config, &request).unwrap());
    let frames = Arc::new(FfmpegExtractor::new(std::env::temp_dir().join("caseline-test")));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        model,
        render,
        frames,
        PipelineConfig {
            inter_call_delay_ms: 0,
            ..PipelineConfig::default()
        },
    ));

    let state = AppState {
        store: store.clone(),
        orchestrator,
        runs: RunRegistry::new(),
        heartbeat_interval_ms: 1000,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    (format!("http://{addr}"), store)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base, _store) = spawn_server().await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_case_crud_roundtrip() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("{base}/cases"))
        .json(&json!({"name": "Dock incident", "description": "night shift"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let case: Value = created.json().await.unwrap();
    let case_id = case["id"].as_str().unwrap();
    assert_eq!(case["status"], "pending");

    let fetched: Value = client
        .get(format!("{base}/cases/{case_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["name"], "Dock incident");

    let missing = client
        .get(format!("{base}/cases/no-such-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_evidence_registration() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let case: Value = client
        .post(format!("{base}/cases"))
        .json(&json!({"name": "Case"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let case_id = case["id"].as_str().unwrap();

    let created = client
        .post(format!("{base}/cases/{case_id}/evidence"))
        .json(&json!({
            "filename": "cam01.jpg",
            "kind": "image",
            "storage_url": "file:///evidence/cam01.jpg"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let item: Value = created.json().await.unwrap();
    assert_eq!(item["kind"], "image");
    assert_eq!(item["caseId"], case_id);

    // Registering against a missing case is a 404.
    let missing = client
        .post(format!("{base}/cases/ghost/evidence"))
        .json(&json!({
            "filename": "x.jpg",
            "kind": "image",
            "storage_url": "file:///x.jpg"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_analysis_endpoints_before_any_run() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let case: Value = client
        .post(format!("{base}/cases"))
        .json(&json!({"name": "Case"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let case_id = case["id"].as_str().unwrap();

    // No persisted analysis and no active run yet.
    let analysis = client
        .get(format!("{base}/cases/{case_id}/analysis"))
        .send()
        .await
        .unwrap();
    assert_eq!(analysis.status(), 404);

    let stream = client
        .get(format!("{base}/cases/{case_id}/analyze/stream"))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), 404);
}

#[tokio::test]
async fn test_analyze_empty_case_accepted_then_errors() {
    let (base, store) = spawn_server().await;
    let client = reqwest::Client::new();

    let case: Value = client
        .post(format!("{base}/cases"))
        .json(&json!({"name": "Empty case"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let case_id = case["id"].as_str().unwrap().to_string();

    let accepted = client
        .post(format!("{base}/cases/{case_id}/analyze"))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 202);
    let body: Value = accepted.json().await.unwrap();
    assert_eq!(body["caseId"], case_id.as_str());

    // The run fails structurally (no evidence) and records the error state.
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let loaded = store.get_case(&case_id).await.unwrap().unwrap();
        if loaded.status == caseline::storage::CaseStatus::Error {
            return;
        }
    }
    panic!("case never reached error status");
}

#[tokio::test]
async fn test_case_reads_running_immediately_after_ack() {
    // Generous retry backoff keeps the background run alive well past the
    // ack, so the status read cannot race a fast terminal transition.
    let (base, _store) = spawn_server_with(RequestConfig {
        timeout_ms: 1000,
        max_retries: 3,
        retry_delay_ms: 500,
    })
    .await;
    let client = reqwest::Client::new();

    let case: Value = client
        .post(format!("{base}/cases"))
        .json(&json!({"name": "Case"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let case_id = case["id"].as_str().unwrap();

    client
        .post(format!("{base}/cases/{case_id}/evidence"))
        .json(&json!({
            "filename": "statement.txt",
            "kind": "text",
            "storage_url": "/nonexistent/statement.txt"
        }))
        .send()
        .await
        .unwrap();

    let accepted = client
        .post(format!("{base}/cases/{case_id}/analyze"))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 202);

    let loaded: Value = client
        .get(format!("{base}/cases/{case_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(loaded["status"], "running");
}

#[tokio::test]
async fn test_analyze_missing_case_is_404() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/cases/ghost/analyze"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
