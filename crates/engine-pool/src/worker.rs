//! Async driver for one engine process.
//!
//! A worker task owns the process's stdin/stdout and a [`RequestQueue`];
//! callers only ever talk to it through an [`EngineHandle`], so nothing else
//! writes to the engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::protocol::SearchResult;
use crate::queue::{PendingRequest, RequestQueue, Search};

#[derive(Debug)]
enum WorkerCommand {
    Evaluate(PendingRequest),
    Shutdown,
}

/// Cheap, cloneable access to one engine's queue.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    level: Arc<str>,
    tx: mpsc::UnboundedSender<WorkerCommand>,
}

impl EngineHandle {
    pub fn level(&self) -> &str {
        &self.level
    }

    /// False once the worker has exited (process died, timed out or shut
    /// down).
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue `fen` and wait for the engine's best move (UCI).
    ///
    /// Dropping the returned future cancels the request if it has not been
    /// sent to the engine yet.
    pub async fn evaluate(&self, fen: &str) -> Result<String, EngineError> {
        Ok(self.search(fen, Search::BestMove).await?.bestmove)
    }

    /// Queue `fen` for a scored search reporting the best `multipv` lines.
    pub async fn analyse(&self, fen: &str, multipv: u32) -> Result<SearchResult, EngineError> {
        self.search(fen, Search::Analyse { multipv }).await
    }

    pub async fn search(&self, fen: &str, search: Search) -> Result<SearchResult, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerCommand::Evaluate(PendingRequest::with_search(fen, search, reply)))
            .map_err(|_| EngineError::Unavailable)?;
        rx.await.map_err(|_| EngineError::Unavailable)?
    }

    /// Ask the worker to quit the engine and reject what is still queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(WorkerCommand::Shutdown);
    }
}

/// A started worker: the handle plus the task driving it.
pub struct RunningEngine {
    pub handle: EngineHandle,
    pub task: JoinHandle<()>,
}

/// Settings for one worker.
#[derive(Clone, Debug)]
pub struct WorkerSettings {
    pub startup_commands: Vec<String>,
    pub evaluate_command: String,
    pub analysis_command: String,
    pub request_timeout: Duration,
}

impl WorkerSettings {
    pub fn for_level(config: &EngineConfig, level: &str) -> Self {
        Self {
            startup_commands: config.startup_commands(level),
            evaluate_command: config.evaluate_command(),
            analysis_command: config.analysis_command(),
            request_timeout: config.request_timeout,
        }
    }
}

/// Spawn the engine executable for `level` and start its worker.
pub fn spawn_process(config: &EngineConfig, level: &str) -> Result<RunningEngine, EngineError> {
    let mut process = Command::new(&config.program)
        .args(&config.args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| EngineError::Spawn(format!("{}: {e}", config.program)))?;

    let stdin = process
        .stdin
        .take()
        .ok_or_else(|| EngineError::Spawn("engine stdin not captured".into()))?;
    let stdout = process
        .stdout
        .take()
        .ok_or_else(|| EngineError::Spawn("engine stdout not captured".into()))?;

    info!(level, program = config.program.as_str(), pid = ?process.id(), "Engine process started");
    Ok(start(
        level,
        stdout,
        stdin,
        Some(process),
        WorkerSettings::for_level(config, level),
    ))
}

/// Start a worker over any byte transport. `child`, when given, is killed
/// if the worker gives up on it.
pub fn start<R, W>(
    level: &str,
    reader: R,
    writer: W,
    child: Option<Child>,
    settings: WorkerSettings,
) -> RunningEngine
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = Worker {
        level: level.to_string(),
        queue: RequestQueue::new(settings.evaluate_command.clone())
            .with_analysis_command(settings.analysis_command.clone()),
        reader,
        writer,
        child,
        settings,
    };
    let task = tokio::spawn(worker.run(rx));
    RunningEngine {
        handle: EngineHandle {
            level: Arc::from(level),
            tx,
        },
        task,
    }
}

enum Event {
    Command(Option<WorkerCommand>),
    Read(std::io::Result<usize>),
    Deadline,
}

struct Worker<R, W> {
    level: String,
    queue: RequestQueue,
    reader: R,
    writer: W,
    child: Option<Child>,
    settings: WorkerSettings,
}

impl<R, W> Worker<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<WorkerCommand>) {
        let startup = std::mem::take(&mut self.settings.startup_commands);
        for cmd in &startup {
            if let Err(e) = self.send(cmd).await {
                warn!(level = self.level.as_str(), error = %e, "Engine startup failed");
                self.stop(&mut rx, EngineError::ProcessDied).await;
                return;
            }
        }

        let mut buf = [0u8; 4096];
        loop {
            if let Err(e) = self.dispatch_next().await {
                warn!(level = self.level.as_str(), error = %e, "Failed to write to engine");
                self.stop(&mut rx, EngineError::ProcessDied).await;
                return;
            }

            let deadline = self.queue.deadline(self.settings.request_timeout);
            let event = tokio::select! {
                cmd = rx.recv() => Event::Command(cmd),
                read = self.reader.read(&mut buf) => Event::Read(read),
                _ = wait_until(deadline) => Event::Deadline,
            };

            match event {
                Event::Command(Some(WorkerCommand::Evaluate(request))) => {
                    debug!(level = self.level.as_str(), fen = request.fen.as_str(), "Request queued");
                    self.queue.push(request);
                }
                Event::Command(Some(WorkerCommand::Shutdown)) | Event::Command(None) => {
                    info!(level = self.level.as_str(), "Engine shutting down");
                    let _ = self.send("quit").await;
                    self.stop(&mut rx, EngineError::ShutDown).await;
                    return;
                }
                Event::Read(Ok(0)) => {
                    warn!(level = self.level.as_str(), "Engine closed its output");
                    self.stop(&mut rx, EngineError::ProcessDied).await;
                    return;
                }
                Event::Read(Ok(n)) => {
                    for line in String::from_utf8_lossy(&buf[..n]).lines() {
                        debug!(level = self.level.as_str(), line, "engine >");
                    }
                    self.queue.feed(&buf[..n]);
                }
                Event::Read(Err(e)) => {
                    warn!(level = self.level.as_str(), error = %e, "Failed to read from engine");
                    self.stop(&mut rx, EngineError::ProcessDied).await;
                    return;
                }
                Event::Deadline => {
                    let fen = self.queue.in_flight().unwrap_or_default().to_string();
                    warn!(
                        level = self.level.as_str(),
                        fen = fen.as_str(),
                        timeout = ?self.settings.request_timeout,
                        "Engine timed out, restarting on next use"
                    );
                    self.queue.fail_in_flight(EngineError::Timeout {
                        fen,
                        after: self.settings.request_timeout,
                    });
                    self.stop(&mut rx, EngineError::Unavailable).await;
                    return;
                }
            }
        }
    }

    /// Send the next waiting request if the engine is idle.
    async fn dispatch_next(&mut self) -> Result<(), EngineError> {
        let Some(position) = self.queue.begin_dispatch(Instant::now()) else {
            return Ok(());
        };
        self.send(&position).await?;
        for cmd in self.queue.confirm_position() {
            self.send(&cmd).await?;
        }
        Ok(())
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(level = self.level.as_str(), cmd, "engine <");
        self.writer
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Io(format!("Failed to write to engine: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| EngineError::Io(format!("Failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    /// Reject everything pending or still arriving, and kill the process.
    async fn stop(&mut self, rx: &mut mpsc::UnboundedReceiver<WorkerCommand>, error: EngineError) {
        rx.close();
        while let Ok(cmd) = rx.try_recv() {
            if let WorkerCommand::Evaluate(request) = cmd {
                self.queue.push(request);
            }
        }
        let rejected = self.queue.drain(error.clone());
        if rejected > 0 {
            warn!(level = self.level.as_str(), rejected, %error, "Rejected pending engine requests");
        }

        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
