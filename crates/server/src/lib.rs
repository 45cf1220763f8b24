//! HTTP surface for the coaching core: position evaluation, game review and
//! in-memory coaching sessions over a loaded game.

pub mod config;
pub mod error;
pub mod routes;
pub mod sessions;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use engine_pool::EngineRegistry;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::sessions::SessionStore;

/// Everything the handlers share. Built once at startup and owned by the
/// caller, which is also responsible for shutting the engines down.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engines: Arc<EngineRegistry>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let engines = Arc::new(EngineRegistry::new(config.engine.clone()));
        Self::with_engines(config, engines)
    }

    pub fn with_engines(config: Config, engines: Arc<EngineRegistry>) -> Self {
        Self {
            config,
            engines,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

pub fn app(state: &AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/api/levels", get(routes::health::list_levels))
        // Engine
        .route("/api/evaluate", post(routes::evaluate::evaluate))
        .route("/api/analyze", post(routes::analysis::analyze))
        // Coaching sessions
        .route("/api/sessions", post(routes::sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(routes::sessions::get_session).delete(routes::sessions::delete_session),
        )
        .route("/api/sessions/{id}/navigate", post(routes::sessions::navigate))
        .route("/api/sessions/{id}/recommendation", post(routes::sessions::set_recommendation))
        .route("/api/sessions/{id}/attempt/start", post(routes::sessions::start_attempt))
        .route("/api/sessions/{id}/attempt/cancel", post(routes::sessions::cancel_attempt))
        .route("/api/sessions/{id}/attempt", post(routes::sessions::submit_attempt))
        .route("/api/sessions/{id}/hint", post(routes::sessions::reveal_hint))
        .route("/api/sessions/{id}/suggest", post(routes::sessions::suggest_move))
        // Shared state
        .layer(Extension(state.engines.clone()))
        .layer(Extension(state.sessions.clone()))
        .layer(Extension(state.config.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
