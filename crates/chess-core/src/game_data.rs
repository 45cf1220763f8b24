use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color, Move, Position};

use crate::error::{CoreError, Result};
use crate::oracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl std::str::FromStr for Side {
    type Err = CoreError;

    /// `"white"` or `"black"`, in any case.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Side::White),
            "black" => Ok(Side::Black),
            _ => Err(CoreError::InvalidColor(s.to_string())),
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameMetadata {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>, // "1-0", "0-1", "1/2-1/2", "*"
    /// Any other tags, in document order.
    pub extra: Vec<(String, String)>,
}

/// A single half-move, resolved by the oracle when it entered the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub san: String, // with check suffix, e.g. "Qxf7#"
    pub uci: String,
    pub from: Option<String>,
    pub to: String,
    pub side: Side,
    /// 1-indexed half-move number.
    pub ply: usize,
    pub move_number: u32,
    pub capture: bool,
    pub promotion: Option<char>,
    pub check: bool,
    pub fen_after: String,
}

impl MoveRecord {
    /// Describe `mv` played from `before`; `ply` is the 1-indexed half-move.
    pub fn describe(before: &Chess, mv: Move, ply: usize) -> Self {
        let san = oracle::san_plus(before, mv);
        let after = before.clone().play(mv).unwrap_or_else(|e| e.position);
        Self {
            check: san.ends_with('+') || san.ends_with('#'),
            san,
            uci: oracle::uci_of(mv),
            from: mv.from().map(|sq| sq.to_string()),
            to: mv.to().to_string(),
            side: before.turn().into(),
            ply,
            move_number: before.fullmoves().get(),
            capture: mv.is_capture(),
            promotion: mv.promotion().map(|r| r.char()),
            fen_after: oracle::fen_of(&after),
        }
    }
}

/// A loaded game: metadata, optional custom start and the main line.
///
/// Only grows, and only at the end.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    metadata: GameMetadata,
    start_fen: Option<String>,
    moves: Vec<MoveRecord>,
}

impl GameRecord {
    /// Build a record. A custom start position must be a valid FEN; the
    /// moves are taken as given.
    pub fn new(
        metadata: GameMetadata,
        start_fen: Option<String>,
        moves: Vec<MoveRecord>,
    ) -> Result<Self> {
        if let Some(fen) = &start_fen {
            oracle::position_from_fen(fen)?;
        }
        Ok(Self {
            metadata,
            start_fen,
            moves,
        })
    }

    pub fn metadata(&self) -> &GameMetadata {
        &self.metadata
    }

    pub fn start_fen(&self) -> Option<&str> {
        self.start_fen.as_deref()
    }

    pub fn initial_fen(&self) -> &str {
        self.start_fen.as_deref().unwrap_or(oracle::STANDARD_START_FEN)
    }

    pub fn initial_position(&self) -> Result<Chess> {
        match &self.start_fen {
            Some(fen) => oracle::position_from_fen(fen),
            None => Ok(Chess::default()),
        }
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub(crate) fn append(&mut self, mv: MoveRecord) {
        self.moves.push(mv);
    }
}
