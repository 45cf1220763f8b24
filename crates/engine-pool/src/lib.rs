//! Engine pool: one long-lived UCI engine process per strength level.
//!
//! Each process keeps a single current position, so requests to one level
//! go through a FIFO [`RequestQueue`] that never has more than one request
//! in flight. An [`EngineRegistry`] starts processes lazily and replaces
//! dead ones.

pub mod config;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod worker;

pub use config::EngineConfig;
pub use error::EngineError;
pub use protocol::{InfoLine, Score, SearchResult};
pub use queue::{PendingRequest, RequestQueue, Search};
pub use registry::{EngineLauncher, EngineRegistry, ProcessLauncher};
pub use worker::{EngineHandle, RunningEngine, WorkerSettings};
