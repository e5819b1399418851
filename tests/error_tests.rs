use axum::{http::StatusCode, response::IntoResponse};
use hiretrack::error::AppError;
use hiretrack::import::spreadsheet::SpreadsheetError;
use hiretrack::import::{ImportError, StagingError};
use http_body_util::BodyExt;
use sea_orm::DbErr;
use serde_json::Value;

async fn status_and_message(error: AppError) -> (StatusCode, String) {
    let response = error.into_response();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap();
    (status, body["error"].as_str().unwrap().to_string())
}

#[test]
fn test_app_error_display() {
    assert_eq!(AppError::NoValidRows.to_string(), "No valid rows to import");
    assert_eq!(
        AppError::NotFound("candidate 3".to_string()).to_string(),
        "Not found: candidate 3"
    );
    assert_eq!(
        AppError::InvalidRequest("ids cannot be empty".to_string()).to_string(),
        "Invalid request: ids cannot be empty"
    );
    assert_eq!(
        AppError::Conflict("User already exists".to_string()).to_string(),
        "Conflict: User already exists"
    );
}

#[tokio::test]
async fn test_app_error_into_response() {
    let cases = [
        (AppError::NoValidRows, StatusCode::BAD_REQUEST),
        (AppError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::Conflict("x".into()), StatusCode::CONFLICT),
        (AppError::UnprocessableEntity("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
        (AppError::ImportFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::SerializationError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        let message = error.to_string();
        let (status, body) = status_and_message(error).await;
        assert_eq!(status, expected);
        assert_eq!(body, message);
    }
}

#[tokio::test]
async fn database_details_are_not_exposed() {
    let error: AppError = DbErr::Custom("relation \"candidates\" does not exist".to_string()).into();
    let (status, body) = status_and_message(error).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Database error");
}

#[tokio::test]
async fn import_failure_carries_committed_count() {
    let error: AppError = ImportError::ImportFailed {
        inserted_before_failure: 400,
        source: DbErr::Custom("connection reset".to_string()),
    }
    .into();

    let (status, body) = status_and_message(error).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Import failed: 400 rows were inserted before the failure");
    assert!(!body.contains("connection reset"));
}

#[tokio::test]
async fn staging_and_spreadsheet_errors_map_to_client_statuses() {
    let (status, _) = status_and_message(StagingError::NotFound("abc".into()).into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = status_and_message(SpreadsheetError::UnsupportedFormat("cv.pdf".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = status_and_message(SpreadsheetError::Malformed("bad zip".into()).into()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
