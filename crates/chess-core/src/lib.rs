//! Game timeline reconstruction, recommendation validation and move
//! classification for game review.
//!
//! `shakmaty` is the single source of chess rules: every move that enters a
//! [`GameRecord`] or is judged by the [`Validator`] goes through it.

pub mod analysis;
pub mod error;
pub mod game_data;
pub mod oracle;
pub mod pgn;
pub mod recommendation;
pub mod timeline;
pub mod validator;

pub use analysis::{Evaluation, GameAnalysis, MoveAnalysis, MoveClass, PlayerMove};
pub use error::{CoreError, Result};
pub use game_data::{GameMetadata, GameRecord, MoveRecord, Side};
pub use pgn::parse_game;
pub use recommendation::{parse_recommendation, parse_report, CoachingReport, Recommendation};
pub use timeline::{ReplayOutcome, Timeline};
pub use validator::{Attempt, AttemptOutcome, ValidationState, Validator};
