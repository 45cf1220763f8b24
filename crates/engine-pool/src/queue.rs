//! FIFO request queue for one engine process, with no I/O of its own.
//!
//! The engine keeps a single "current position" and answers one `go` at a
//! time, so results are attributed by order alone. The queue therefore
//! allows at most one request past `Idle`:
//!
//! ```text
//! Idle --begin_dispatch--> PositionSet --confirm_position--> AwaitingResult
//!   ^                                                              |
//!   +------------------------- result line ------------------------+
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::protocol::{parse_info, parse_result, InfoLine, LineBuffer, SearchResult};

pub type Reply = oneshot::Sender<Result<SearchResult, EngineError>>;

/// What the engine is asked to do with a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    /// A move to play, with the quick evaluate command.
    BestMove,
    /// Scored lines for the best `multipv` moves, with the analysis command.
    Analyse { multipv: u32 },
}

impl Search {
    fn multipv(self) -> u32 {
        match self {
            Search::BestMove => 1,
            Search::Analyse { multipv } => multipv.max(1),
        }
    }
}

/// A caller waiting for the engine's answer in `fen`.
#[derive(Debug)]
pub struct PendingRequest {
    pub fen: String,
    pub search: Search,
    reply: Reply,
}

impl PendingRequest {
    pub fn new(fen: impl Into<String>, reply: Reply) -> Self {
        Self::with_search(fen, Search::BestMove, reply)
    }

    pub fn with_search(fen: impl Into<String>, search: Search, reply: Reply) -> Self {
        Self {
            fen: fen.into(),
            search,
            reply,
        }
    }

    /// The caller dropped its receiver.
    pub fn is_cancelled(&self) -> bool {
        self.reply.is_closed()
    }

    fn resolve(self, result: Result<SearchResult, EngineError>) {
        if self.reply.send(result).is_err() {
            debug!(fen = self.fen.as_str(), "Result for cancelled request dropped");
        }
    }
}

#[derive(Debug)]
enum EngineState {
    Idle,
    PositionSet { request: PendingRequest, since: Instant },
    AwaitingResult { request: PendingRequest, since: Instant },
}

#[derive(Debug)]
pub struct RequestQueue {
    state: EngineState,
    waiting: VecDeque<PendingRequest>,
    lines: LineBuffer,
    /// Latest line per `multipv` slot for the request in flight.
    infos: BTreeMap<u32, InfoLine>,
    /// The engine's current MultiPV option.
    multipv: u32,
    evaluate_command: String,
    analysis_command: String,
}

impl RequestQueue {
    pub fn new(evaluate_command: impl Into<String>) -> Self {
        let evaluate_command = evaluate_command.into();
        Self {
            state: EngineState::Idle,
            waiting: VecDeque::new(),
            lines: LineBuffer::new(),
            infos: BTreeMap::new(),
            multipv: 1,
            analysis_command: evaluate_command.clone(),
            evaluate_command,
        }
    }

    /// Search command for [`Search::Analyse`] requests; defaults to the
    /// evaluate command.
    pub fn with_analysis_command(mut self, command: impl Into<String>) -> Self {
        self.analysis_command = command.into();
        self
    }

    pub fn push(&mut self, request: PendingRequest) {
        self.waiting.push_back(request);
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, EngineState::Idle)
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Requests sent to or waiting for the engine.
    pub fn pending_len(&self) -> usize {
        self.waiting.len() + usize::from(!self.is_idle())
    }

    /// FEN of the request currently owned by the engine.
    pub fn in_flight(&self) -> Option<&str> {
        match &self.state {
            EngineState::Idle => None,
            EngineState::PositionSet { request, .. }
            | EngineState::AwaitingResult { request, .. } => Some(&request.fen),
        }
    }

    /// When the in-flight request runs out of time.
    pub fn deadline(&self, timeout: Duration) -> Option<Instant> {
        match &self.state {
            EngineState::Idle => None,
            EngineState::PositionSet { since, .. } | EngineState::AwaitingResult { since, .. } => {
                Some(*since + timeout)
            }
        }
    }

    /// Take the oldest live request and return the `position` command for
    /// it. `None` unless idle with work waiting.
    pub fn begin_dispatch(&mut self, now: Instant) -> Option<String> {
        if !self.is_idle() {
            return None;
        }
        while let Some(request) = self.waiting.pop_front() {
            if request.is_cancelled() {
                debug!(fen = request.fen.as_str(), "Skipping cancelled request");
                continue;
            }
            let command = format!("position fen {}", request.fen);
            self.state = EngineState::PositionSet {
                request,
                since: now,
            };
            return Some(command);
        }
        None
    }

    /// After the position is written: move to `AwaitingResult` and return
    /// the commands that start the search, a MultiPV change first when the
    /// request needs one. Empty unless a position was just set.
    pub fn confirm_position(&mut self) -> Vec<String> {
        match std::mem::replace(&mut self.state, EngineState::Idle) {
            EngineState::PositionSet { request, since } => {
                let mut commands = Vec::with_capacity(2);
                let wanted = request.search.multipv();
                if wanted != self.multipv {
                    commands.push(format!("setoption name MultiPV value {wanted}"));
                    self.multipv = wanted;
                }
                commands.push(match request.search {
                    Search::BestMove => self.evaluate_command.clone(),
                    Search::Analyse { .. } => self.analysis_command.clone(),
                });
                self.infos.clear();
                self.state = EngineState::AwaitingResult { request, since };
                commands
            }
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    /// Feed raw stdout. Returns how many requests were resolved.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        let lines = self.lines.push(chunk);
        lines.iter().filter(|line| self.on_line(line)).count()
    }

    /// Handle one complete line; `true` if it resolved a request.
    pub fn on_line(&mut self, line: &str) -> bool {
        if let Some(info) = parse_info(line) {
            if matches!(self.state, EngineState::AwaitingResult { .. }) {
                self.infos.insert(info.multipv, info);
            }
            return false;
        }
        let Some(result) = parse_result(line) else {
            return false;
        };
        match std::mem::replace(&mut self.state, EngineState::Idle) {
            EngineState::AwaitingResult { request, .. } => {
                debug!(fen = request.fen.as_str(), ?result, "Request resolved");
                let infos = std::mem::take(&mut self.infos);
                request.resolve(result.map(|bestmove| SearchResult {
                    bestmove,
                    lines: infos.into_values().collect(),
                }));
                true
            }
            other => {
                warn!(line, "Result line with no request awaiting it");
                self.state = other;
                false
            }
        }
    }

    /// Reject the in-flight request only.
    pub fn fail_in_flight(&mut self, error: EngineError) {
        match std::mem::replace(&mut self.state, EngineState::Idle) {
            EngineState::Idle => {}
            EngineState::PositionSet { request, .. } | EngineState::AwaitingResult { request, .. } => {
                request.resolve(Err(error));
            }
        }
    }

    /// Reject everything, in-flight first, then the waiting requests in order.
    pub fn drain(&mut self, error: EngineError) -> usize {
        let count = self.pending_len();
        self.fail_in_flight(error.clone());
        for request in self.waiting.drain(..) {
            request.resolve(Err(error.clone()));
        }
        count
    }
}
