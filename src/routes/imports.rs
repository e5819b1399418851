use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::import::{ImportError, ImportReport, Importer, StagedUpload, UploadStatus};
use crate::store::SeaOrmCandidateStore;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportRowsRequest {
    /// Parsed spreadsheet rows: header -> cell value. Entries that are not
    /// objects are ignored.
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmUploadResponse {
    pub file_id: String,
    pub status: UploadStatus,
    #[serde(flatten)]
    pub report: ImportReport,
}

async fn run_import(state: &AppState, auth: &AuthUser, rows: &[serde_json::Value]) -> Result<ImportReport, ImportError> {
    let store = SeaOrmCandidateStore::new(state.db.clone());
    let importer = Importer::new(&store, &state.aliases, state.import_settings);
    importer.import(rows, Some(auth.id)).await
}

/// Import already-parsed rows directly
#[utoipa::path(
    post,
    path = "/api/candidates/import",
    tag = "Import",
    request_body = ImportRowsRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Rows imported", body = ImportReport),
        (status = 400, description = "No valid rows"),
        (status = 500, description = "A batch insert failed")
    )
)]
#[tracing::instrument(skip(state, request), fields(rows = request.rows.len()))]
pub async fn import_rows(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ImportRowsRequest>,
) -> Result<Json<ImportReport>, AppError> {
    let report = run_import(&state, &auth, &request.rows).await?;
    Ok(Json(report))
}

/// Upload a spreadsheet for later confirmation
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "Import",
    request_body(content = String, content_type = "multipart/form-data", description = "A `file` part holding a .csv, .xlsx, .xls or .ods spreadsheet"),
    security(("bearer" = [])),
    responses(
        (status = 201, description = "File staged, nothing imported yet", body = StagedUpload),
        (status = 400, description = "No file or unsupported file type"),
        (status = 422, description = "File could not be read as a spreadsheet")
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_spreadsheet(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StagedUpload>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("failed to read upload: {}", e)))?;

        let staged = state.staging.stage(auth.id, &file_name, &bytes).await?;
        return Ok((StatusCode::CREATED, Json(staged)));
    }

    Err(AppError::InvalidRequest("no file part in upload".into()))
}

/// Import a staged upload
#[utoipa::path(
    post,
    path = "/api/uploads/{file_id}/confirm",
    tag = "Import",
    params(("file_id" = String, Path, description = "Id returned by the upload")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Rows imported, staged file removed", body = ConfirmUploadResponse),
        (status = 400, description = "No valid rows; the upload stays pending"),
        (status = 404, description = "No pending upload with this id, or another confirm already claimed it"),
        (status = 500, description = "A batch insert failed; the upload stays pending only if nothing was committed")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn confirm_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<ConfirmUploadResponse>, AppError> {
    // Only one confirm can hold the claim; a concurrent one gets 404
    let claimed = state.staging.claim(auth.id, &file_id).await?;
    let result = run_import(&state, &auth, claimed.rows()).await;

    let report = match result {
        Ok(report) => {
            if let Err(e) = claimed.finish().await {
                warn!("Imported upload {} but could not remove it: {}", file_id, e);
            }
            report
        }
        Err(err) if err.committed_rows() == 0 => {
            // Nothing was written, so the upload can be confirmed again
            if let Err(e) = claimed.release().await {
                warn!("Could not return upload {} to pending: {}", file_id, e);
            }
            return Err(err.into());
        }
        Err(err) => {
            // A retry would insert the committed batches twice
            warn!(
                "Upload {} dropped after a partial import of {} rows",
                file_id,
                err.committed_rows()
            );
            if let Err(e) = claimed.finish().await {
                warn!("Could not remove upload {}: {}", file_id, e);
            }
            return Err(err.into());
        }
    };
    info!("Upload {} imported ({} rows)", file_id, report.inserted_count);

    Ok(Json(ConfirmUploadResponse {
        file_id,
        status: UploadStatus::Imported,
        report,
    }))
}

/// Discard a staged upload without importing it
#[utoipa::path(
    delete,
    path = "/api/uploads/{file_id}",
    tag = "Import",
    params(("file_id" = String, Path, description = "Id returned by the upload")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Upload discarded"),
        (status = 404, description = "No pending upload with this id")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn discard_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.staging.remove(auth.id, &file_id).await?;
    info!("Upload {} discarded", file_id);
    Ok(StatusCode::NO_CONTENT)
}
