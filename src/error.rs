use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use std::fmt;

use crate::import::{ImportError, StagingError};
use crate::import::spreadsheet::SpreadsheetError;

#[derive(Debug)]
pub enum AppError {
    NoValidRows,
    ImportFailed(String),
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    InvalidRequest(String),
    UnprocessableEntity(String),
    DatabaseError(String),
    SerializationError(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoValidRows => write!(f, "No valid rows to import"),
            AppError::ImportFailed(msg) => write!(f, "Import failed: {}", msg),
            AppError::NotFound(what) => write!(f, "Not found: {}", what),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::UnprocessableEntity(msg) => write!(f, "Unprocessable Entity: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        tracing::error!("Database operation failed: {}", err);
        AppError::DatabaseError(err.to_string())
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::NoValidRows => AppError::NoValidRows,
            ImportError::ImportFailed { inserted_before_failure, source } => {
                tracing::error!("Import batch insert failed: {}", source);
                AppError::ImportFailed(format!(
                    "{} rows were inserted before the failure",
                    inserted_before_failure
                ))
            }
        }
    }
}

impl From<SpreadsheetError> for AppError {
    fn from(err: SpreadsheetError) -> Self {
        match err {
            SpreadsheetError::UnsupportedFormat(_) => AppError::InvalidRequest(err.to_string()),
            SpreadsheetError::Malformed(_) => AppError::UnprocessableEntity(err.to_string()),
        }
    }
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::NotFound(_) => AppError::NotFound(err.to_string()),
            StagingError::Spreadsheet(inner) => inner.into(),
            StagingError::Io(inner) => AppError::InternalError(inner.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NoValidRows => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ImportFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Storage details stay in the logs
        let error_message = match &self {
            AppError::DatabaseError(_) => "Database error".to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
