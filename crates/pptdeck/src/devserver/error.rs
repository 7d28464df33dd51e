use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use super::files::FileOpsError;

#[derive(Debug, Error)]
pub enum DevApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

/// Body of every failed authoring call.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl DevApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            DevApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DevApiError::NotFound(_) => StatusCode::NOT_FOUND,
            DevApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DevApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("authoring request failed: {self}");
        }
        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<FileOpsError> for DevApiError {
    fn from(err: FileOpsError) -> Self {
        match err {
            FileOpsError::Invalid(msg) => DevApiError::BadRequest(msg),
            FileOpsError::NotFound(msg) => DevApiError::NotFound(msg),
            other => DevApiError::Internal(other.to_string()),
        }
    }
}
