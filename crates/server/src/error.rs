use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_core::CoreError;
use engine_pool::EngineError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) | AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Core(e) => match e {
                CoreError::InvalidGame(_)
                | CoreError::InvalidFen(_)
                | CoreError::InvalidRecommendation(_)
                | CoreError::InvalidAttempt(_)
                | CoreError::InvalidColor(_) => StatusCode::BAD_REQUEST,
                CoreError::IndexOutOfRange { .. }
                | CoreError::NoRecommendation
                | CoreError::NotAwaitingMove => StatusCode::CONFLICT,
            },
            AppError::Engine(e) => match e {
                EngineError::UnknownLevel(_) => StatusCode::BAD_REQUEST,
                EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                EngineError::Malformed(_) => StatusCode::BAD_GATEWAY,
                EngineError::Spawn(_)
                | EngineError::Io(_)
                | EngineError::ProcessDied
                | EngineError::Unavailable
                | EngineError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                msg.clone()
            }
            AppError::Anyhow(e) => {
                tracing::error!("Unexpected error: {e}");
                "Internal server error".to_string()
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {e}");
                e.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
