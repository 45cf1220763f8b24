//! Position timeline: materializes the board at any ply of a [`GameRecord`].
//!
//! Index `-1` is the starting position; index `i` is the position after
//! `i + 1` half-moves. Every reconstruction replays the SAN tokens through
//! the oracle from the start, it never trusts cached per-move FENs.

use serde::Serialize;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::game_data::{GameRecord, MoveRecord};
use crate::oracle;

/// Result of replaying the record up to some index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// Every requested move applied.
    Complete { fen: String },
    /// Move at `failed_index` did not apply; `fen` is the position after
    /// `reached_index`, the last one that did.
    Truncated {
        fen: String,
        reached_index: isize,
        failed_index: usize,
        token: String,
    },
}

impl ReplayOutcome {
    pub fn fen(&self) -> &str {
        match self {
            ReplayOutcome::Complete { fen } | ReplayOutcome::Truncated { fen, .. } => fen,
        }
    }

    pub fn into_fen(self) -> String {
        match self {
            ReplayOutcome::Complete { fen } | ReplayOutcome::Truncated { fen, .. } => fen,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ReplayOutcome::Complete { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Timeline {
    record: GameRecord,
    index: isize,
}

impl Timeline {
    /// Start before the first move.
    pub fn new(record: GameRecord) -> Self {
        Self { record, index: -1 }
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn last_index(&self) -> isize {
        self.record.len() as isize - 1
    }

    pub fn contains(&self, index: isize) -> bool {
        (-1..=self.last_index()).contains(&index)
    }

    /// Replay moves `[0..=index]` from the starting position.
    ///
    /// A move that fails to apply truncates the replay at the previous
    /// position and is reported as [`ReplayOutcome::Truncated`].
    pub fn reconstruct(&self, index: isize) -> Result<ReplayOutcome> {
        if !self.contains(index) {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.record.len(),
            });
        }

        let mut pos = self.record.initial_position()?;
        let count = (index + 1) as usize;
        for (i, mv) in self.record.moves()[..count].iter().enumerate() {
            match oracle::play_san(&pos, &mv.san) {
                Some((_, next)) => pos = next,
                None => {
                    let fen = oracle::fen_of(&pos);
                    warn!(
                        index = i,
                        token = mv.san.as_str(),
                        fen = fen.as_str(),
                        "Replay failed, falling back to last good position"
                    );
                    return Ok(ReplayOutcome::Truncated {
                        fen,
                        reached_index: i as isize - 1,
                        failed_index: i,
                        token: mv.san.clone(),
                    });
                }
            }
        }

        Ok(ReplayOutcome::Complete {
            fen: oracle::fen_of(&pos),
        })
    }

    /// Best known FEN at `index`, truncated replays included.
    pub fn fen_at(&self, index: isize) -> Result<String> {
        self.reconstruct(index).map(ReplayOutcome::into_fen)
    }

    pub fn current_fen(&self) -> Result<String> {
        self.fen_at(self.index)
    }

    /// FEN for every index from `-1` to the last move.
    pub fn positions(&self) -> Result<Vec<String>> {
        (-1..=self.last_index()).map(|i| self.fen_at(i)).collect()
    }

    /// Move to `index` if it is `-1` or a valid move index. Anything else is
    /// rejected and the current index is kept.
    pub fn navigate(&mut self, index: isize) -> Result<isize> {
        if !self.contains(index) {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.record.len(),
            });
        }
        self.index = index;
        Ok(index)
    }

    pub fn step_forward(&mut self) -> Result<isize> {
        self.navigate(self.index + 1)
    }

    pub fn step_back(&mut self) -> Result<isize> {
        self.navigate(self.index - 1)
    }

    pub fn jump_to_start(&mut self) -> isize {
        self.index = -1;
        self.index
    }

    pub fn jump_to_end(&mut self) -> isize {
        self.index = self.last_index();
        self.index
    }

    /// The move that produced the position at `index`.
    pub fn move_at(&self, index: isize) -> Option<&MoveRecord> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.record.moves().get(i))
    }

    pub(crate) fn append(&mut self, mv: MoveRecord) {
        self.record.append(mv);
    }
}
