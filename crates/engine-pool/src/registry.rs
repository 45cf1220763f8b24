//! One engine worker per level, started on first use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::protocol::SearchResult;
use crate::worker::{self, EngineHandle, RunningEngine};

/// Starts the worker for a level. Swapped out in tests for in-memory engines.
pub trait EngineLauncher: Send + Sync {
    fn launch(&self, config: &EngineConfig, level: &str) -> Result<RunningEngine, EngineError>;
}

/// Launches the configured executable as a child process.
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl EngineLauncher for ProcessLauncher {
    fn launch(&self, config: &EngineConfig, level: &str) -> Result<RunningEngine, EngineError> {
        worker::spawn_process(config, level)
    }
}

struct Slot {
    handle: EngineHandle,
    task: JoinHandle<()>,
}

pub struct EngineRegistry {
    config: EngineConfig,
    launcher: Box<dyn EngineLauncher>,
    slots: Mutex<HashMap<String, Slot>>,
    shut_down: AtomicBool,
}

impl EngineRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_launcher(config, ProcessLauncher)
    }

    pub fn with_launcher(config: EngineConfig, launcher: impl EngineLauncher + 'static) -> Self {
        Self {
            config,
            launcher: Box::new(launcher),
            slots: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn levels(&self) -> &[String] {
        &self.config.levels
    }

    pub fn default_level(&self) -> Option<&str> {
        self.config.levels.first().map(String::as_str)
    }

    /// Levels with a live worker right now.
    pub fn running_levels(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let mut levels: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.handle.is_alive())
            .map(|(level, _)| level.clone())
            .collect();
        levels.sort();
        levels
    }

    /// Handle for `level`, starting its engine if there is none yet or the
    /// previous one has died.
    pub fn get_or_create(&self, level: &str) -> Result<EngineHandle, EngineError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShutDown);
        }
        if !self.config.has_level(level) {
            return Err(EngineError::UnknownLevel(level.to_string()));
        }

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // `shutdown_all` may have drained the slots while we waited.
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShutDown);
        }
        if let Some(slot) = slots.get(level) {
            if slot.handle.is_alive() {
                return Ok(slot.handle.clone());
            }
            warn!(level, "Engine worker is gone, starting a new one");
        }

        let RunningEngine { handle, task } = self.launcher.launch(&self.config, level)?;
        info!(level, "Engine worker started");
        slots.insert(
            level.to_string(),
            Slot {
                handle: handle.clone(),
                task,
            },
        );
        Ok(handle)
    }

    pub async fn evaluate(&self, level: &str, fen: &str) -> Result<String, EngineError> {
        self.get_or_create(level)?.evaluate(fen).await
    }

    pub async fn analyse(
        &self,
        level: &str,
        fen: &str,
        multipv: u32,
    ) -> Result<SearchResult, EngineError> {
        self.get_or_create(level)?.analyse(fen, multipv).await
    }

    /// Quit every engine, reject whatever is still pending and wait for the
    /// workers to exit. The registry refuses new work afterwards.
    pub async fn shutdown_all(&self) -> usize {
        self.shut_down.store(true, Ordering::SeqCst);
        let slots: Vec<(String, Slot)> = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.drain().collect()
        };

        let count = slots.len();
        for (_, slot) in &slots {
            slot.handle.shutdown();
        }
        for (level, slot) in slots {
            if let Err(e) = slot.task.await {
                warn!(level = level.as_str(), error = %e, "Engine worker ended abnormally");
            }
        }
        info!(count, "All engines shut down");
        count
    }
}
