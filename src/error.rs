use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidMessage(_) => 400,
            AppError::NotFound => 404,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Storage(_)
            | AppError::Database(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

fn error_code(err: &AppError) -> &'static str {
    match err {
        AppError::InvalidMessage(_) => "INVALID_MESSAGE",
        AppError::NotFound => "NOT_FOUND",
        AppError::Storage(_) | AppError::Database(_) => "STORAGE_ERROR",
        AppError::Config(_) | AppError::StartServer(_) => "INTERNAL_SERVER_ERROR",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.to_string(),
            code: error_code(&self),
        };
        (status, Json(body)).into_response()
    }
}
