use std::path::PathBuf;
use std::time::Duration;

use engine_pool::EngineConfig;
use reqwest::Client;
use server::config::Config;
use server::AppState;

/// Answers every `go` with `bestmove e2e4`, ignores everything else.
pub const ANSWERING_ENGINE: &str = r#"while IFS= read -r line; do
  case "$line" in
    go*) echo "info depth 1 nodes 1"; echo "bestmove e2e4" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
  esac
done"#;

/// Reports two scored lines for every search: e2e4 at +3.00 for the side
/// to move, then d2d4.
pub const ANALYSING_ENGINE: &str = r#"while IFS= read -r line; do
  case "$line" in
    go*)
      echo "info depth 1 multipv 1 score cp 300 pv e2e4"
      echo "info depth 1 multipv 2 score cp 250 pv d2d4"
      echo "bestmove e2e4" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
  esac
done"#;

/// Reads commands and never answers.
pub const SILENT_ENGINE: &str = "cat > /dev/null";

pub const ITALIAN_PGN: &str = r#"[Event "Casual game"]
[White "Alice"]
[Black "Bob"]
[Result "*"]

1. e4 e5 2. Nf3 Nc6 3. Bc4 Nf6 *"#;

/// A server running in-process on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Engine config that runs `script` through `sh -c`.
pub fn shell_engine(script: &str, timeout: Duration) -> EngineConfig {
    EngineConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        levels: vec!["1100".to_string(), "1500".to_string()],
        weights_dir: PathBuf::from("/nonexistent"),
        request_timeout: timeout,
        ..EngineConfig::default()
    }
}

pub async fn spawn_server(engine: EngineConfig) -> TestServer {
    let state = AppState::new(Config::with_engine(engine));
    let router = server::app(&state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server error");
    });

    TestServer {
        base_url: format!("http://{addr}"),
        state,
        client: Client::new(),
    }
}

pub async fn spawn_default_server() -> TestServer {
    spawn_server(shell_engine(ANSWERING_ENGINE, Duration::from_secs(5))).await
}
