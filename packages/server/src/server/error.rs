use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use listing_sync::SyncError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("unknown source `{0}`")]
    UnknownSource(String),

    #[error("{0}")]
    Sync(#[from] SyncError),

    #[error("crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownSource(_) => StatusCode::NOT_FOUND,
            ApiError::Sync(err) if err.is_upstream() => StatusCode::BAD_GATEWAY,
            ApiError::Sync(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (code, Json(body)).into_response()
    }
}
