use std::sync::Arc;

use axum::{Extension, Json};
use engine_pool::EngineRegistry;
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::sessions::SessionStore;

/// GET /health
pub async fn health_check(
    Extension(engines): Extension<Arc<EngineRegistry>>,
    Extension(sessions): Extension<Arc<SessionStore>>,
) -> Json<JsonValue> {
    Json(serde_json::json!({
        "status": "ok",
        "engines": engines.running_levels(),
        "sessions": sessions.len(),
    }))
}

/// GET /api/levels
pub async fn list_levels(
    Extension(engines): Extension<Arc<EngineRegistry>>,
    Extension(config): Extension<Config>,
) -> Json<JsonValue> {
    Json(serde_json::json!({
        "levels": engines.levels(),
        "default": config.default_level,
    }))
}
