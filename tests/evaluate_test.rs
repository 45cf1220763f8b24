//! Integration tests for the evaluate endpoint.
//!
//! Spawns the server in-process with a shell stub standing in for the engine.
#![cfg(unix)]

mod common;

use std::time::Duration;

use serde_json::{json, Value};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

async fn post_evaluate(server: &common::TestServer, body: Value) -> reqwest::Response {
    server
        .client
        .post(server.url("/api/evaluate"))
        .json(&body)
        .send()
        .await
        .expect("Failed to send evaluate request")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_and_levels() {
    let server = common::spawn_default_server().await;

    let resp = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = server.client.get(server.url("/api/levels")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["levels"], json!(["1100", "1500"]));
    assert_eq!(body["default"], "1100");
}

#[tokio::test]
async fn test_evaluate_returns_bestmove() {
    let server = common::spawn_default_server().await;

    let resp = post_evaluate(&server, json!({ "fen": START_FEN })).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["bestmove"], "e2e4");
    assert_eq!(body["san"], "e4");
    assert_eq!(body["level"], "1100");

    // Same level reuses the running process.
    let resp = post_evaluate(&server, json!({ "fen": START_FEN, "level": "1100" })).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(server.state.engines.running_levels(), vec!["1100"]);

    server.state.engines.shutdown_all().await;
}

#[tokio::test]
async fn test_concurrent_evaluations_all_answered() {
    let server = common::spawn_default_server().await;

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = server.client.clone();
            let url = server.url("/api/evaluate");
            tokio::spawn(async move {
                client
                    .post(url)
                    .json(&json!({ "fen": START_FEN, "level": "1500" }))
                    .send()
                    .await
                    .expect("Failed to send evaluate request")
            })
        })
        .collect();

    for handle in handles {
        let resp = handle.await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["bestmove"], "e2e4");
    }

    server.state.engines.shutdown_all().await;
}

#[tokio::test]
async fn test_evaluate_rejects_bad_input() {
    let server = common::spawn_default_server().await;

    let resp = post_evaluate(&server, json!({ "fen": "not a position" })).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid FEN"));

    let resp = post_evaluate(&server, json!({ "fen": "" })).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = post_evaluate(&server, json!({ "position": START_FEN })).await;
    assert_eq!(resp.status(), 400);

    let resp = post_evaluate(&server, json!({ "fen": START_FEN, "level": "2800" })).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("2800"));

    // Nothing was started for rejected requests.
    assert!(server.state.engines.running_levels().is_empty());
}

#[tokio::test]
async fn test_silent_engine_times_out_with_error() {
    let server = common::spawn_server(common::shell_engine(
        common::SILENT_ENGINE,
        Duration::from_millis(300),
    ))
    .await;

    let resp = post_evaluate(&server, json!({ "fen": START_FEN })).await;
    assert!(resp.status().is_server_error());
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no result"));
}

#[tokio::test]
async fn test_missing_engine_binary_is_server_error() {
    let mut engine = common::shell_engine(common::ANSWERING_ENGINE, Duration::from_secs(1));
    engine.program = "/nonexistent/engine-binary".to_string();
    let server = common::spawn_server(engine).await;

    let resp = post_evaluate(&server, json!({ "fen": START_FEN })).await;
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Failed to spawn engine"));
}
