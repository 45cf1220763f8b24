use std::sync::Arc;

use axum::{Extension, Json};
use chess_core::oracle;
use engine_pool::EngineRegistry;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Config;
use crate::error::AppError;
use crate::routes::ValidatedJson;

#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateBody {
    #[validate(length(min = 1, message = "fen must not be empty"))]
    pub fen: String,
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub bestmove: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub san: Option<String>,
    pub level: String,
}

/// Ask the engine for `level` what it would play in `fen`.
pub async fn suggest(
    engines: &EngineRegistry,
    level: &str,
    fen: &str,
) -> Result<Suggestion, AppError> {
    let pos = oracle::position_from_fen(fen)?;
    let bestmove = engines.evaluate(level, fen.trim()).await?;
    let san = oracle::san_of_uci(&pos, &bestmove);
    if san.is_none() {
        tracing::warn!(level, fen, bestmove = bestmove.as_str(), "Engine suggested an unplayable move");
    }
    Ok(Suggestion {
        bestmove,
        san,
        level: level.to_string(),
    })
}

/// POST /api/evaluate
/// Best move for a position at the requested (or default) level.
pub async fn evaluate(
    Extension(engines): Extension<Arc<EngineRegistry>>,
    Extension(config): Extension<Config>,
    ValidatedJson(body): ValidatedJson<EvaluateBody>,
) -> Result<Json<Suggestion>, AppError> {
    let level = config.level_or_default(body.level.as_deref());
    let suggestion = suggest(&engines, level, &body.fen).await?;
    Ok(Json(suggestion))
}
