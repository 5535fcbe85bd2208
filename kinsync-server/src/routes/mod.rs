pub mod sources;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kinsync_core::{KinsyncError, SyncError};
use serde::Serialize;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert anyhow errors to HTTP responses
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<SyncError>() {
            return match err {
                SyncError::NotFound(_) => StatusCode::NOT_FOUND,
                SyncError::Disabled(_) | SyncError::AlreadySyncing(_) => StatusCode::CONFLICT,
                SyncError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SyncError::Fetch(_) => StatusCode::BAD_GATEWAY,
                SyncError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }

        match self.0.downcast_ref::<KinsyncError>() {
            Some(KinsyncError::SourceNotFound(_)) => StatusCode::NOT_FOUND,
            Some(KinsyncError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(KinsyncError::SourceBusy(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
