//! Recommendation validator: judges a learner's move against a
//! [`Recommendation`] and tracks revealed hints.
//!
//! `Idle -> AwaitingMove -> Resolved`. Illegal and legal-but-unrecommended
//! attempts keep the validator in `AwaitingMove` on the same frozen
//! position; only an acceptable move resolves it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::game_data::MoveRecord;
use crate::oracle;
use crate::recommendation::Recommendation;
use crate::timeline::{ReplayOutcome, Timeline};

/// A move attempt given as squares, e.g. `{from: "e7", to: "e8", promotion: "q"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub promotion: Option<char>,
}

impl Attempt {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, role: char) -> Self {
        self.promotion = Some(role);
        self
    }

    /// Parse a UCI string such as `e2e4` or `e7e8q`.
    pub fn from_uci(uci: &str) -> Result<Self> {
        let uci = uci.trim();
        if !uci.is_ascii() || !(uci.len() == 4 || uci.len() == 5) {
            return Err(CoreError::InvalidAttempt(format!("bad UCI move '{uci}'")));
        }
        Ok(Self {
            from: uci[0..2].to_string(),
            to: uci[2..4].to_string(),
            promotion: uci[4..].chars().next(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ValidationState {
    Idle,
    AwaitingMove {
        frozen_index: isize,
        frozen_fen: String,
    },
    Resolved {
        san: String,
        uci: String,
        fen_after: String,
        appended: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// One of the acceptable moves; the validator is resolved.
    Success {
        san: String,
        uci: String,
        fen_after: String,
        appended: bool,
    },
    /// Legal but not recommended; the frozen position is unchanged.
    Suboptimal {
        san: String,
        uci: String,
        acceptable: Vec<String>,
    },
    /// Not a legal move in the frozen position; try again.
    Illegal { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Validator {
    recommendation: Recommendation,
    revealed_hints: usize,
    state: ValidationState,
}

impl Validator {
    pub fn new(recommendation: Recommendation) -> Self {
        Self {
            recommendation,
            revealed_hints: 0,
            state: ValidationState::Idle,
        }
    }

    pub fn recommendation(&self) -> &Recommendation {
        &self.recommendation
    }

    pub fn state(&self) -> &ValidationState {
        &self.state
    }

    pub fn is_awaiting_move(&self) -> bool {
        matches!(self.state, ValidationState::AwaitingMove { .. })
    }

    /// Position being judged while awaiting a move.
    pub fn frozen_fen(&self) -> Option<&str> {
        match &self.state {
            ValidationState::AwaitingMove { frozen_fen, .. } => Some(frozen_fen),
            _ => None,
        }
    }

    /// Position after the learner's accepted move, once resolved.
    pub fn resolved_fen(&self) -> Option<&str> {
        match &self.state {
            ValidationState::Resolved { fen_after, .. } => Some(fen_after),
            _ => None,
        }
    }

    pub fn revealed_hint_count(&self) -> usize {
        self.revealed_hints
    }

    /// The hints revealed so far.
    pub fn hints(&self) -> &[String] {
        &self.recommendation.hints[..self.revealed_hints]
    }

    pub fn hints_remaining(&self) -> usize {
        self.recommendation.hints.len() - self.revealed_hints
    }

    /// Reveal one more hint. Once all are shown this is a no-op that
    /// returns `None`.
    pub fn reveal_next_hint(&mut self) -> Option<&str> {
        if self.revealed_hints >= self.recommendation.hints.len() {
            return None;
        }
        self.revealed_hints += 1;
        Some(&self.recommendation.hints[self.revealed_hints - 1])
    }

    /// Freeze the position the learner moves from and wait for attempts.
    ///
    /// Calling it again while already waiting keeps the original freeze.
    pub fn start_attempt(&mut self, timeline: &Timeline) -> Result<&str> {
        if !self.is_awaiting_move() {
            let frozen_index = self.recommendation.timeline_index();
            let frozen_fen = match timeline.reconstruct(frozen_index)? {
                ReplayOutcome::Complete { fen } => fen,
                ReplayOutcome::Truncated { failed_index, token, .. } => {
                    return Err(CoreError::InvalidGame(format!(
                        "cannot reach ply {}: move {} '{token}' does not apply",
                        self.recommendation.target_ply,
                        failed_index + 1
                    )));
                }
            };
            info!(
                target_ply = self.recommendation.target_ply,
                frozen_index,
                fen = frozen_fen.as_str(),
                "Awaiting learner move"
            );
            self.state = ValidationState::AwaitingMove {
                frozen_index,
                frozen_fen,
            };
        }
        self.frozen_fen().ok_or(CoreError::NotAwaitingMove)
    }

    /// Give up on the current attempt without touching the game.
    pub fn cancel(&mut self) {
        if self.is_awaiting_move() {
            self.state = ValidationState::Idle;
        }
    }

    /// Judge an attempt against the frozen position.
    ///
    /// On success the move is appended to the record when the frozen
    /// position is the end of the game, and the timeline advances by one.
    pub fn validate(&mut self, timeline: &mut Timeline, attempt: &Attempt) -> Result<AttemptOutcome> {
        let (frozen_index, frozen_fen) = match &self.state {
            ValidationState::AwaitingMove {
                frozen_index,
                frozen_fen,
            } => (*frozen_index, frozen_fen.clone()),
            _ => return Err(CoreError::NotAwaitingMove),
        };

        let pos = oracle::position_from_fen(&frozen_fen)?;
        let Some(mv) = oracle::move_from_squares(&pos, &attempt.from, &attempt.to, attempt.promotion)?
        else {
            debug!(from = %attempt.from, to = %attempt.to, "Illegal attempt");
            return Ok(AttemptOutcome::Illegal {
                reason: format!(
                    "{}{} is not a legal move here",
                    attempt.from,
                    attempt.to
                ),
            });
        };

        let ply = (frozen_index + 2) as usize;
        let accepted = self.recommendation.accepts(&pos, mv);
        let record = MoveRecord::describe(&pos, mv, ply);

        if !accepted {
            debug!(san = record.san.as_str(), "Legal but not recommended");
            return Ok(AttemptOutcome::Suboptimal {
                san: record.san,
                uci: record.uci,
                acceptable: self.recommendation.acceptable_moves.clone(),
            });
        }

        let appended = frozen_index == timeline.last_index();
        let (san, uci, fen_after) = (record.san.clone(), record.uci.clone(), record.fen_after.clone());
        if appended {
            timeline.append(record);
        }
        // The next index always exists here: either the game's own move or
        // the one just appended.
        timeline.navigate(frozen_index + 1)?;

        info!(san = san.as_str(), appended, "Recommended move found");
        self.state = ValidationState::Resolved {
            san: san.clone(),
            uci: uci.clone(),
            fen_after: fen_after.clone(),
            appended,
        };
        Ok(AttemptOutcome::Success {
            san,
            uci,
            fen_after,
            appended,
        })
    }
}
