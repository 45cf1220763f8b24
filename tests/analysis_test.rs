//! Integration tests for game review: classification by centipawn loss over
//! a scripted engine.
#![cfg(unix)]

mod common;

use std::time::Duration;

use serde_json::{json, Value};

const SCHOLARS_MATE: &str = "1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0";

async fn post_analyze(server: &common::TestServer, body: Value) -> reqwest::Response {
    server
        .client
        .post(server.url("/api/analyze"))
        .json(&body)
        .send()
        .await
        .expect("Failed to send analyze request")
}

async fn analysing_server() -> common::TestServer {
    common::spawn_server(common::shell_engine(common::ANALYSING_ENGINE, Duration::from_secs(5))).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_white_moves_classified() {
    let server = analysing_server().await;

    let resp = post_analyze(
        &server,
        json!({ "pgn": "1. e4 e5 2. Nf3 Nc6", "player_color": "white" }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["player"], "white");
    assert_eq!(body["level"], "1100");

    let moves = body["moves"].as_array().unwrap();
    assert_eq!(moves.len(), 2);

    // +3.00 before the move, +3.00 for Black after it: 600 lost.
    assert_eq!(moves[0]["san"], "e4");
    assert_eq!(moves[0]["eval_before"], 300);
    assert_eq!(moves[0]["eval_after"], -300);
    assert_eq!(moves[0]["cp_loss"], 600);
    assert_eq!(moves[0]["class"], "blunder");
    assert_eq!(moves[0]["best_move"], "e4");
    assert_eq!(moves[0]["top_moves"], json!(["e4", "d4"]));

    // e2e4 is no longer playable: only d4 survives as an alternative.
    assert_eq!(moves[1]["san"], "Nf3");
    assert!(moves[1].get("best_move").is_none());
    assert_eq!(moves[1]["top_moves"], json!(["d4"]));

    server.state.engines.shutdown_all().await;
}

#[tokio::test]
async fn test_mate_scored_without_engine() {
    let server = analysing_server().await;

    let resp = post_analyze(&server, json!({ "pgn": SCHOLARS_MATE, "player_color": "WHITE" })).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let moves = body["moves"].as_array().unwrap();
    assert_eq!(moves.len(), 4);

    let mate = &moves[3];
    assert_eq!(mate["san"], "Qxf7#");
    assert_eq!(mate["eval_after"], 10_000);
    assert_eq!(mate["class"], "fine");
    assert_eq!(mate["top_moves"], json!([]));

    server.state.engines.shutdown_all().await;
}

#[tokio::test]
async fn test_black_perspective() {
    let server = analysing_server().await;

    let resp = post_analyze(
        &server,
        json!({ "pgn": "1. e4 e5", "player_color": "black", "level": "1500" }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["level"], "1500");
    let moves = body["moves"].as_array().unwrap();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0]["san"], "e5");
    assert_eq!(moves[0]["eval_before"], -300);
    assert_eq!(moves[0]["eval_after"], 300);
    assert_eq!(moves[0]["cp_loss"], 600);
    // Neither scripted move is legal for Black.
    assert_eq!(moves[0]["top_moves"], json!([]));

    server.state.engines.shutdown_all().await;
}

#[tokio::test]
async fn test_bad_requests() {
    let server = analysing_server().await;

    let resp = post_analyze(&server, json!({ "pgn": "1. e4", "player_color": "green" })).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("green"));

    let resp = post_analyze(&server, json!({ "pgn": "", "player_color": "white" })).await;
    assert_eq!(resp.status(), 400);

    let resp = post_analyze(&server, json!({ "pgn": "1. e4" })).await;
    assert_eq!(resp.status(), 400);

    let resp = post_analyze(
        &server,
        json!({ "pgn": "1. e4", "player_color": "white", "level": "2900" }),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_engine_without_scores_is_bad_gateway() {
    let server = common::spawn_default_server().await;

    let resp = post_analyze(&server, json!({ "pgn": "1. e4", "player_color": "white" })).await;
    assert_eq!(resp.status(), 502);

    server.state.engines.shutdown_all().await;
}
