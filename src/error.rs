use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use scylla::transport::errors::{NewSessionError, QueryError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to connect: {0}")]
    Connect(#[from] NewSessionError),

    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    #[error("malformed row in {table}: {reason}")]
    Row { table: &'static str, reason: String },

    #[error("corrupt snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("could not allocate id for {0} after repeated contention")]
    IdContention(&'static str),
}

impl StoreError {
    pub(crate) fn row(table: &'static str, reason: impl ToString) -> Self {
        StoreError::Row {
            table,
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::Forbidden(_) => "Forbidden",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Store(_) => "StoreError",
            AppError::Io(_) => "IoError",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub result: bool,
    pub error_type: &'static str,
    pub error_message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_message = match self {
            AppError::Store(_) | AppError::Io(_) => {
                error!("Request failed: {:?}", self);
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            result: false,
            error_type: self.error_type(),
            error_message,
        })
    }
}
