//! Move-by-move review of one player's moves, classified by how many
//! centipawns each one gave away against the engine's evaluation.
//!
//! The engine itself lives elsewhere; this module works on its numbers.
//! Scores come in from the side to move's point of view and are reported
//! from White's.

use serde::Serialize;
use shakmaty::Position;

use crate::error::Result;
use crate::game_data::{GameRecord, MoveRecord, Side};
use crate::oracle;

pub const INACCURACY_THRESHOLD: i32 = 50;
pub const MISTAKE_THRESHOLD: i32 = 100;
pub const BLUNDER_THRESHOLD: i32 = 200;

/// A forced mate scores this, less the moves to mate.
pub const MATE_SCORE: i32 = 10_000;

/// How many engine moves are listed for a mistake or blunder.
pub const TOP_MOVES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveClass {
    Fine,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveClass {
    pub fn from_loss(cp_loss: i32) -> Self {
        if cp_loss >= BLUNDER_THRESHOLD {
            MoveClass::Blunder
        } else if cp_loss >= MISTAKE_THRESHOLD {
            MoveClass::Mistake
        } else if cp_loss >= INACCURACY_THRESHOLD {
            MoveClass::Inaccuracy
        } else {
            MoveClass::Fine
        }
    }

    /// Mistakes and blunders get the engine's better moves listed.
    pub fn needs_alternatives(self) -> bool {
        self >= MoveClass::Mistake
    }
}

/// A side-to-move score seen from White.
pub fn white_pov(score: i32, to_move: Side) -> i32 {
    match to_move {
        Side::White => score,
        Side::Black => -score,
    }
}

/// Centipawns `mover` gave away; both evaluations from White's point of view.
pub fn centipawn_loss(mover: Side, before: i32, after: i32) -> i32 {
    match mover {
        Side::White => before - after,
        Side::Black => after - before,
    }
}

/// Score of a finished game for the side to move: `-MATE_SCORE` when mated,
/// 0 for stalemate. `None` while there are moves to play.
pub fn terminal_score(fen: &str) -> Result<Option<i32>> {
    let pos = oracle::position_from_fen(fen)?;
    Ok(if pos.is_checkmate() {
        Some(-MATE_SCORE)
    } else if pos.is_stalemate() {
        Some(0)
    } else {
        None
    })
}

/// A move to review and the position it was played from.
#[derive(Debug, Clone, Copy)]
pub struct PlayerMove<'a> {
    pub fen_before: &'a str,
    pub record: &'a MoveRecord,
}

/// Every move `player` made in `record`, in order.
pub fn player_moves(record: &GameRecord, player: Side) -> Vec<PlayerMove<'_>> {
    let mut fen_before = record.initial_fen();
    let mut moves = Vec::new();
    for mv in record.moves() {
        if mv.side == player {
            moves.push(PlayerMove {
                fen_before,
                record: mv,
            });
        }
        fen_before = &mv.fen_after;
    }
    moves
}

/// The engine's view of one position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Centipawns for the side to move.
    pub score: i32,
    /// UCI moves, best first.
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveAnalysis {
    pub ply: usize,
    pub move_number: u32,
    pub san: String,
    pub fen_before: String,
    pub eval_before: i32,
    pub eval_after: i32,
    pub cp_loss: i32,
    pub class: MoveClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_move: Option<String>,
    /// SAN of the engine's top moves, for mistakes and blunders only.
    pub top_moves: Vec<String>,
}

impl MoveAnalysis {
    /// Classify `mv` from the evaluations of the positions before and
    /// after it. Candidates that are not legal before the move are dropped.
    pub fn new(mv: PlayerMove<'_>, before: &Evaluation, after: &Evaluation) -> Result<Self> {
        let mover = mv.record.side;
        let eval_before = white_pov(before.score, mover);
        let eval_after = white_pov(after.score, mover.opposite());
        let cp_loss = centipawn_loss(mover, eval_before, eval_after);
        let class = MoveClass::from_loss(cp_loss);

        let pos = oracle::position_from_fen(mv.fen_before)?;
        let best_move = before
            .candidates
            .first()
            .and_then(|uci| oracle::san_of_uci(&pos, uci));
        let top_moves = if class.needs_alternatives() {
            before
                .candidates
                .iter()
                .filter_map(|uci| oracle::san_of_uci(&pos, uci))
                .take(TOP_MOVES)
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            ply: mv.record.ply,
            move_number: mv.record.move_number,
            san: mv.record.san.clone(),
            fen_before: mv.fen_before.to_string(),
            eval_before,
            eval_after,
            cp_loss,
            class,
            best_move,
            top_moves,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameAnalysis {
    pub player: Side,
    pub moves: Vec<MoveAnalysis>,
}

impl GameAnalysis {
    pub fn count(&self, class: MoveClass) -> usize {
        self.moves.iter().filter(|m| m.class == class).count()
    }

    /// Mistakes and blunders, in game order.
    pub fn key_moments(&self) -> impl Iterator<Item = &MoveAnalysis> {
        self.moves.iter().filter(|m| m.class.needs_alternatives())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgn::parse_game;

    const SCHOLARS_MATE: &str = "1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0";

    fn eval(score: i32, candidates: &[&str]) -> Evaluation {
        Evaluation {
            score,
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(MoveClass::from_loss(-30), MoveClass::Fine);
        assert_eq!(MoveClass::from_loss(49), MoveClass::Fine);
        assert_eq!(MoveClass::from_loss(50), MoveClass::Inaccuracy);
        assert_eq!(MoveClass::from_loss(99), MoveClass::Inaccuracy);
        assert_eq!(MoveClass::from_loss(100), MoveClass::Mistake);
        assert_eq!(MoveClass::from_loss(200), MoveClass::Blunder);
        assert!(!MoveClass::Inaccuracy.needs_alternatives());
        assert!(MoveClass::Mistake.needs_alternatives());
    }

    #[test]
    fn test_loss_is_from_the_mover_side() {
        // White drops from +0.40 to -0.20.
        assert_eq!(centipawn_loss(Side::White, 40, -20), 60);
        // Black lets White go from +0.40 to +1.60.
        assert_eq!(centipawn_loss(Side::Black, 40, 160), 120);
        assert_eq!(white_pov(35, Side::Black), -35);
    }

    #[test]
    fn test_player_moves_track_positions() {
        let record = parse_game(SCHOLARS_MATE).unwrap();
        let black = player_moves(&record, Side::Black);
        assert_eq!(
            black.iter().map(|m| m.record.san.as_str()).collect::<Vec<_>>(),
            vec!["e5", "Nc6", "Nf6"]
        );
        assert_eq!(black[0].fen_before, record.moves()[0].fen_after);

        let white = player_moves(&record, Side::White);
        assert_eq!(white.len(), 4);
        assert_eq!(white[0].fen_before, oracle::STANDARD_START_FEN);
    }

    #[test]
    fn test_blunder_lists_legal_alternatives() {
        let record = parse_game(SCHOLARS_MATE).unwrap();
        let nf6 = player_moves(&record, Side::Black)[2];

        // Before Nf6 Black (to move) is a little worse; after it White
        // mates in one.
        let before = eval(-20, &["g7g6", "h2h4", "d8e7", "d8f6"]);
        let after = eval(MATE_SCORE - 1, &["h5f7"]);
        let analysis = MoveAnalysis::new(nf6, &before, &after).unwrap();

        assert_eq!(analysis.san, "Nf6");
        assert_eq!(analysis.ply, 6);
        assert_eq!(analysis.move_number, 3);
        assert_eq!(analysis.eval_before, 20);
        assert_eq!(analysis.eval_after, 9_999);
        assert_eq!(analysis.cp_loss, 9_979);
        assert_eq!(analysis.class, MoveClass::Blunder);
        assert_eq!(analysis.best_move.as_deref(), Some("g6"));
        assert_eq!(analysis.top_moves, vec!["g6", "Qe7", "Qf6"]);
    }

    #[test]
    fn test_fine_move_has_no_alternatives() {
        let record = parse_game(SCHOLARS_MATE).unwrap();
        let e4 = player_moves(&record, Side::White)[0];
        let analysis =
            MoveAnalysis::new(e4, &eval(30, &["e2e4", "d2d4"]), &eval(-25, &["e7e5"])).unwrap();
        assert_eq!(analysis.cp_loss, 5);
        assert_eq!(analysis.class, MoveClass::Fine);
        assert_eq!(analysis.best_move.as_deref(), Some("e4"));
        assert!(analysis.top_moves.is_empty());

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["class"], "fine");
    }

    #[test]
    fn test_terminal_scores() {
        let record = parse_game(SCHOLARS_MATE).unwrap();
        let mated = &record.moves()[6].fen_after;
        assert_eq!(terminal_score(mated).unwrap(), Some(-MATE_SCORE));
        assert_eq!(terminal_score("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap(), Some(0));
        assert_eq!(terminal_score(oracle::STANDARD_START_FEN).unwrap(), None);
    }

    #[test]
    fn test_key_moments() {
        let record = parse_game(SCHOLARS_MATE).unwrap();
        let moves = player_moves(&record, Side::Black);
        let quiet = eval(0, &[]);
        let analysis = GameAnalysis {
            player: Side::Black,
            moves: vec![
                MoveAnalysis::new(moves[0], &quiet, &quiet).unwrap(),
                MoveAnalysis::new(moves[2], &quiet, &eval(MATE_SCORE - 1, &[])).unwrap(),
            ],
        };
        assert_eq!(analysis.count(MoveClass::Blunder), 1);
        assert_eq!(analysis.count(MoveClass::Fine), 1);
        assert_eq!(
            analysis.key_moments().map(|m| m.san.as_str()).collect::<Vec<_>>(),
            vec!["Nf6"]
        );
    }
}
