//! Thin layer over `shakmaty`: FEN in/out, SAN resolution, square-based
//! move attempts.

use shakmaty::{
    fen::Fen, san::San, san::SanPlus, uci::UciMove, CastlingMode, Chess, EnPassantMode, Move,
    Position, Role, Square,
};

use crate::error::{CoreError, Result};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse and validate a FEN into a playable position.
pub fn position_from_fen(fen: &str) -> Result<Chess> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| CoreError::InvalidFen(format!("{fen}: {e}")))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| CoreError::InvalidFen(format!("{fen}: {e}")))
}

pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Resolve a SAN token against `pos` and play it. Castling may be written
/// with zeros.
pub fn play_san(pos: &Chess, token: &str) -> Option<(Move, Chess)> {
    let san: San = normalize_san(token).replace('0', "O").parse().ok()?;
    let mv = san.to_move(pos).ok()?;
    let next = pos.clone().play(mv).ok()?;
    Some((mv, next))
}

/// SAN of `mv` in `pos`, including the check/mate suffix.
pub fn san_plus(pos: &Chess, mv: Move) -> String {
    SanPlus::from_move(pos.clone(), mv).to_string()
}

pub fn uci_of(mv: Move) -> String {
    UciMove::from_move(mv, CastlingMode::Standard).to_string()
}

/// SAN for a UCI move string, when it is legal in `pos`.
pub fn san_of_uci(pos: &Chess, uci: &str) -> Option<String> {
    let uci: UciMove = uci.trim().parse().ok()?;
    let mv = uci.to_move(pos).ok()?;
    Some(san_plus(pos, mv))
}

/// Resolve a token written either as SAN or as UCI.
pub fn resolve_move(pos: &Chess, token: &str) -> Option<Move> {
    if let Some((mv, _)) = play_san(pos, token) {
        return Some(mv);
    }
    let uci: UciMove = token.trim().to_ascii_lowercase().parse().ok()?;
    uci.to_move(pos).ok()
}

/// Strip check/mate suffixes and annotation glyphs so "Qxf7#" and "Qxf7"
/// compare equal.
pub fn normalize_san(token: &str) -> &str {
    token.trim().trim_end_matches(['+', '#', '!', '?'])
}

/// Build a move from square names, e.g. `("e7", "e8", Some('q'))`.
///
/// Malformed squares or promotion letters are input errors; a well-formed
/// but illegal move yields `Ok(None)`.
pub fn move_from_squares(
    pos: &Chess,
    from: &str,
    to: &str,
    promotion: Option<char>,
) -> Result<Option<Move>> {
    let from_sq = parse_square(from)?;
    let to_sq = parse_square(to)?;
    let promotion = match promotion {
        Some(c) => Some(
            Role::from_char(c.to_ascii_lowercase())
                .filter(|r| !matches!(r, Role::Pawn | Role::King))
                .ok_or_else(|| CoreError::InvalidAttempt(format!("bad promotion piece '{c}'")))?,
        ),
        None => None,
    };

    let uci = UciMove::Normal {
        from: from_sq,
        to: to_sq,
        promotion,
    };
    Ok(uci.to_move(pos).ok())
}

fn parse_square(s: &str) -> Result<Square> {
    s.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| CoreError::InvalidAttempt(format!("bad square '{s}'")))
}
