//! Engine pool error types

use std::time::Duration;

use thiserror::Error;

/// Cloneable so one failure can reject every pending request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    #[error("Engine I/O error: {0}")]
    Io(String),

    #[error("Engine gave no result for {fen} within {after:?}")]
    Timeout { fen: String, after: Duration },

    #[error("Engine process died")]
    ProcessDied,

    #[error("Backing engine process unavailable")]
    Unavailable,

    #[error("Unknown engine level: {0}")]
    UnknownLevel(String),

    #[error("Engine pool is shut down")]
    ShutDown,

    #[error("Malformed engine output: {0}")]
    Malformed(String),
}
