use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::FilmId;

/// Failure of a remote metadata request. `Clone` so a single outcome can be
/// handed to every caller waiting on the same in-flight fetch.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FetchError {
    #[error("film not found: {0}")]
    NotFound(FilmId),

    #[error("remote quota exhausted")]
    RateLimited,

    #[error("remote rejected credentials")]
    AuthInvalid,

    #[error("transient remote failure: {0}")]
    Transient(String),

    #[error("malformed remote response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound(_) => "not_found",
            FetchError::RateLimited => "rate_limited",
            FetchError::AuthInvalid => "auth_invalid",
            FetchError::Transient(_) => "transient",
            FetchError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Whether a stale local record may stand in for this failure.
    pub fn allows_stale_fallback(&self) -> bool {
        !matches!(self, FetchError::NotFound(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::Transient(err.to_string())
        }
    }
}

/// A cache tier could not be read or written. Always recovered as a miss.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("shared store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("shared store returned status {0}")]
    Status(u16),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] jiff::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum AppError {
    Fetch(FetchError),
    Storage(StorageError),
    BadRequest(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Fetch(err) => err.fmt(f),
            AppError::Storage(err) => err.fmt(f),
            AppError::BadRequest(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Fetch(err) => {
                let status = match err {
                    FetchError::NotFound(_) => StatusCode::NOT_FOUND,
                    FetchError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    FetchError::AuthInvalid | FetchError::MalformedResponse(_) => {
                        StatusCode::BAD_GATEWAY
                    },
                    FetchError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, err.kind())
            },
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_failure"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        let body = Json(json!({ "error": kind, "message": self.to_string() }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
