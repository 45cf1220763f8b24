//! Engine configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_LEVELS: &[&str] = &[
    "1100", "1200", "1300", "1400", "1500", "1600", "1700", "1800", "1900",
];

#[derive(Clone, Debug, Serialize)]
pub struct EngineConfig {
    /// Engine executable
    pub program: String,

    /// Extra command-line arguments
    pub args: Vec<String>,

    /// Level ids; one process per level
    pub levels: Vec<String>,

    /// Directory holding `maia-<level>.pb.gz` weight files
    pub weights_dir: PathBuf,

    /// Nodes per evaluation; 1 means a single policy-network lookup
    pub nodes: u32,

    /// Search time for scored analysis requests
    #[serde(skip)]
    pub analysis_movetime: Duration,

    /// Deadline for one in-flight request
    #[serde(skip)]
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "lc0".to_string(),
            args: Vec::new(),
            levels: DEFAULT_LEVELS.iter().map(|l| l.to_string()).collect(),
            weights_dir: PathBuf::from("weights"),
            nodes: 1,
            analysis_movetime: Duration::from_millis(100),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let program = env::var("ENGINE_PATH").unwrap_or(defaults.program);

        let args = env::var("ENGINE_ARGS")
            .map(|v| v.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        let levels = env::var("ENGINE_LEVELS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.levels);

        let weights_dir = env::var("ENGINE_WEIGHTS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.weights_dir);

        let nodes = env::var("ENGINE_NODES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.nodes);

        let analysis_movetime = env::var("ENGINE_ANALYSIS_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.analysis_movetime);

        let request_timeout = env::var("ENGINE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        Self {
            program,
            args,
            levels,
            weights_dir,
            nodes,
            analysis_movetime,
            request_timeout,
        }
    }

    pub fn has_level(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l == level)
    }

    pub fn weights_file(&self, level: &str) -> PathBuf {
        self.weights_dir.join(format!("maia-{level}.pb.gz"))
    }

    /// Commands written once when a level's process starts.
    pub fn startup_commands(&self, level: &str) -> Vec<String> {
        vec![
            "uci".to_string(),
            format!(
                "setoption name WeightsFile value {}",
                self.weights_file(level).display()
            ),
            "setoption name Threads value 1".to_string(),
            "isready".to_string(),
        ]
    }

    pub fn evaluate_command(&self) -> String {
        format!("go nodes {}", self.nodes)
    }

    pub fn analysis_command(&self) -> String {
        format!("go movetime {}", self.analysis_movetime.as_millis())
    }
}
