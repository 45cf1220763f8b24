use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use chess_core::{parse_game, parse_report, Attempt, Timeline};
use engine_pool::EngineRegistry;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use validator::{Validate, ValidationError};

use crate::config::Config;
use crate::error::AppError;
use crate::routes::evaluate::{suggest, Suggestion};
use crate::routes::ValidatedJson;
use crate::sessions::{Session, SessionStore};

fn snapshot_json(session: &Session, id: u64) -> Result<JsonValue, AppError> {
    serde_json::to_value(session.snapshot(id)?)
        .map_err(|e| AppError::Internal(format!("Failed to serialize session: {e}")))
}

fn validate_square(value: &str) -> Result<(), ValidationError> {
    let bytes = value.as_bytes();
    let ok = bytes.len() == 2
        && (b'a'..=b'h').contains(&bytes[0].to_ascii_lowercase())
        && (b'1'..=b'8').contains(&bytes[1]);
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("square").with_message("expected a square such as e4".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionBody {
    #[validate(length(min = 1, message = "pgn must not be empty"))]
    pub pgn: String,
}

/// POST /api/sessions
/// Load a game and open a coaching session on it.
pub async fn create_session(
    Extension(sessions): Extension<Arc<SessionStore>>,
    ValidatedJson(body): ValidatedJson<CreateSessionBody>,
) -> Result<Json<JsonValue>, AppError> {
    let record = parse_game(&body.pgn)?;
    let id = sessions.insert(Session::new(Timeline::new(record)));
    let snapshot = sessions.with_session(id, |s| snapshot_json(s, id))?;
    Ok(Json(snapshot))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let snapshot = sessions.with_session(id, |s| snapshot_json(s, id))?;
    Ok(Json(snapshot))
}

/// DELETE /api/sessions/{id}
pub async fn delete_session(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    if !sessions.remove(id) {
        return Err(AppError::NotFound(format!("Session {id} not found")));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NavigateBody {
    #[validate(range(min = -1, message = "index must be -1 or a move index"))]
    pub index: isize,
}

/// POST /api/sessions/{id}/navigate
/// Jump to a timeline index; out-of-range targets are rejected with 409
/// and leave the session where it was. An open attempt survives, its
/// position stays in `frozen_fen`.
pub async fn navigate(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
    ValidatedJson(body): ValidatedJson<NavigateBody>,
) -> Result<Json<JsonValue>, AppError> {
    let snapshot = sessions.with_session(id, |s| {
        s.navigate(body.index)?;
        snapshot_json(s, id)
    })?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecommendationBody {
    #[validate(length(min = 1, message = "payload must not be empty"))]
    pub payload: String,
    /// Which recommendation of the report to coach on; the first by default.
    pub index: Option<usize>,
}

/// POST /api/sessions/{id}/recommendation
/// Attach a coaching report and make one of its recommendations active.
pub async fn set_recommendation(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
    ValidatedJson(body): ValidatedJson<RecommendationBody>,
) -> Result<Json<JsonValue>, AppError> {
    let report = parse_report(&body.payload)?;
    let chosen = match body.index {
        Some(i) => Some(report.recommendations.get(i).cloned().ok_or_else(|| {
            AppError::BadRequest(format!(
                "Report has {} recommendations, no index {i}",
                report.recommendations.len()
            ))
        })?),
        None => report.recommendations.first().cloned(),
    };

    let snapshot = sessions.with_session(id, |s| {
        s.set_report(report, chosen);
        snapshot_json(s, id)
    })?;
    Ok(Json(snapshot))
}

/// POST /api/sessions/{id}/attempt/start
/// Freeze the position before the recommended move.
pub async fn start_attempt(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let snapshot = sessions.with_session(id, |s| {
        s.start_attempt()?;
        snapshot_json(s, id)
    })?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AttemptBody {
    #[validate(custom(function = "validate_square"))]
    pub from: String,
    #[validate(custom(function = "validate_square"))]
    pub to: String,
    #[validate(length(equal = 1, message = "promotion is a single piece letter"))]
    pub promotion: Option<String>,
}

/// POST /api/sessions/{id}/attempt
/// Judge a learner's move against the frozen position.
pub async fn submit_attempt(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
    ValidatedJson(body): ValidatedJson<AttemptBody>,
) -> Result<Json<JsonValue>, AppError> {
    let mut attempt = Attempt::new(&body.from, &body.to);
    if let Some(role) = body.promotion.as_deref().and_then(|p| p.chars().next()) {
        attempt = attempt.with_promotion(role);
    }

    let response = sessions.with_session(id, |s| {
        let outcome = s.submit_attempt(&attempt)?;

        let mut snapshot = snapshot_json(s, id)?;
        let outcome = serde_json::to_value(&outcome)
            .map_err(|e| AppError::Internal(format!("Failed to serialize outcome: {e}")))?;
        if let Some(map) = snapshot.as_object_mut() {
            map.insert("attempt".to_string(), outcome);
        }
        Ok(snapshot)
    })?;
    Ok(Json(response))
}

/// POST /api/sessions/{id}/attempt/cancel
pub async fn cancel_attempt(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let snapshot = sessions.with_session(id, |s| {
        s.cancel_attempt()?;
        snapshot_json(s, id)
    })?;
    Ok(Json(snapshot))
}

/// POST /api/sessions/{id}/hint
/// Reveal the next hint; a no-op once all are shown.
pub async fn reveal_hint(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Path(id): Path<u64>,
) -> Result<Json<JsonValue>, AppError> {
    let snapshot = sessions.with_session(id, |s| {
        s.validator_mut()?.reveal_next_hint();
        snapshot_json(s, id)
    })?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuggestBody {
    pub level: Option<String>,
}

/// POST /api/sessions/{id}/suggest
/// Engine move for the position currently shown in the session.
pub async fn suggest_move(
    Extension(sessions): Extension<Arc<SessionStore>>,
    Extension(engines): Extension<Arc<EngineRegistry>>,
    Extension(config): Extension<Config>,
    Path(id): Path<u64>,
    ValidatedJson(body): ValidatedJson<SuggestBody>,
) -> Result<Json<Suggestion>, AppError> {
    let fen = sessions.with_session(id, |s| s.display_fen())?;
    let level = config.level_or_default(body.level.as_deref());
    let suggestion = suggest(&engines, level, &fen).await?;
    Ok(Json(suggestion))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_validation() {
        assert!(validate_square("e4").is_ok());
        // Case is normalised when the move is resolved.
        assert!(validate_square("H8").is_ok());
        assert!(validate_square("i1").is_err());
        assert!(validate_square("e9").is_err());
        assert!(validate_square("e").is_err());

        let body = AttemptBody {
            from: "g8".into(),
            to: "f6".into(),
            promotion: Some("qq".into()),
        };
        assert!(body.validate().is_err());
    }
}
