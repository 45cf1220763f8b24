//! Error types for game loading, timeline navigation and move validation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid game: {0}")]
    InvalidGame(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Timeline index {index} out of range for {len} moves")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Invalid recommendation: {0}")]
    InvalidRecommendation(String),

    #[error("No recommendation loaded")]
    NoRecommendation,

    #[error("Not waiting for a move attempt")]
    NotAwaitingMove,

    #[error("Invalid move attempt: {0}")]
    InvalidAttempt(String),

    #[error("Invalid player color '{0}': expected white or black")]
    InvalidColor(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
