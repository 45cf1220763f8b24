use std::sync::Arc;

use axum::{Extension, Json};
use chess_core::analysis::{self, MATE_SCORE, TOP_MOVES};
use chess_core::{parse_game, Evaluation, GameAnalysis, GameRecord, MoveAnalysis, Side};
use engine_pool::{EngineError, EngineRegistry};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Config;
use crate::error::AppError;
use crate::routes::ValidatedJson;

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeBody {
    #[validate(length(min = 1, message = "pgn must not be empty"))]
    pub pgn: String,
    /// "white" or "black"
    pub player_color: String,
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Review {
    pub level: String,
    #[serde(flatten)]
    pub analysis: GameAnalysis,
}

/// Engine view of `fen`. Finished games are scored without asking the
/// engine.
async fn evaluate_position(
    engines: &EngineRegistry,
    level: &str,
    fen: &str,
    multipv: u32,
) -> Result<Evaluation, AppError> {
    if let Some(score) = analysis::terminal_score(fen)? {
        return Ok(Evaluation {
            score,
            candidates: Vec::new(),
        });
    }

    let result = engines.analyse(level, fen, multipv).await?;
    let score = result
        .score()
        .ok_or_else(|| EngineError::Malformed(format!("no score reported for {fen}")))?;
    Ok(Evaluation {
        score: score.centipawns(MATE_SCORE),
        candidates: result.candidates().map(String::from).collect(),
    })
}

/// Review every move `player` made: one multi-line search before the move
/// and one after it.
pub async fn analyse_game(
    engines: &EngineRegistry,
    level: &str,
    record: &GameRecord,
    player: Side,
) -> Result<GameAnalysis, AppError> {
    let mut moves = Vec::new();
    for mv in analysis::player_moves(record, player) {
        let before = evaluate_position(engines, level, mv.fen_before, TOP_MOVES as u32).await?;
        let after = evaluate_position(engines, level, &mv.record.fen_after, 1).await?;
        let reviewed = MoveAnalysis::new(mv, &before, &after)?;
        tracing::debug!(
            ply = reviewed.ply,
            san = reviewed.san.as_str(),
            cp_loss = reviewed.cp_loss,
            class = ?reviewed.class,
            "Move reviewed"
        );
        moves.push(reviewed);
    }

    let analysis = GameAnalysis { player, moves };
    tracing::info!(
        level,
        ?player,
        moves = analysis.moves.len(),
        key_moments = analysis.key_moments().count(),
        "Game reviewed"
    );
    Ok(analysis)
}

/// POST /api/analyze
/// Classify one player's moves by centipawn loss, with the engine's top
/// moves for each mistake and blunder.
pub async fn analyze(
    Extension(engines): Extension<Arc<EngineRegistry>>,
    Extension(config): Extension<Config>,
    ValidatedJson(body): ValidatedJson<AnalyzeBody>,
) -> Result<Json<Review>, AppError> {
    let player: Side = body.player_color.parse()?;
    let record = parse_game(&body.pgn)?;
    let level = config.level_or_default(body.level.as_deref());

    let analysis = analyse_game(&engines, level, &record, player).await?;
    Ok(Json(Review {
        level: level.to_string(),
        analysis,
    }))
}
