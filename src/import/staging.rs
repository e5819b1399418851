//! Upload-then-confirm staging.
//!
//! An upload is written to the staging directory and reported as `Pending`
//! with its row count. Confirming first claims the file by renaming it to
//! `<name>.importing`, so only one confirm can ever import it, then decodes
//! it for the importer. Discarding removes a pending file without touching
//! the database. Staged files are named `<owner>-<uuid>.<ext>` so one user
//! cannot confirm or discard another user's upload. Files left behind are
//! removed by [`StagingArea::sweep_expired`].

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::spreadsheet::{self, SpreadsheetError, SpreadsheetFormat};

/// Appended to a staged file's name while its import runs.
const CLAIM_SUFFIX: &str = ".importing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Imported,
    Discarded,
}

/// A staged upload waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StagedUpload {
    pub file_id: String,
    pub file_name: String,
    pub row_count: usize,
    pub status: UploadStatus,
}

#[derive(Debug)]
pub enum StagingError {
    /// No staged file with that id belongs to the caller.
    NotFound(String),
    Spreadsheet(SpreadsheetError),
    Io(io::Error),
}

impl fmt::Display for StagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagingError::NotFound(id) => write!(f, "No pending upload with id {}", id),
            StagingError::Spreadsheet(err) => write!(f, "{}", err),
            StagingError::Io(err) => write!(f, "Staging storage error: {}", err),
        }
    }
}

impl std::error::Error for StagingError {}

impl From<SpreadsheetError> for StagingError {
    fn from(err: SpreadsheetError) -> Self {
        StagingError::Spreadsheet(err)
    }
}

impl From<io::Error> for StagingError {
    fn from(err: io::Error) -> Self {
        StagingError::Io(err)
    }
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validates and stores an upload. Nothing is imported yet.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn stage(&self, owner: i32, file_name: &str, bytes: &[u8]) -> Result<StagedUpload, StagingError> {
        let format = SpreadsheetFormat::from_file_name(file_name)
            .ok_or_else(|| SpreadsheetError::UnsupportedFormat(file_name.to_string()))?;
        let rows = spreadsheet::decode(format, bytes)?;

        let ext = extension_of(file_name);
        let file_id = Uuid::new_v4().to_string();

        fs::create_dir_all(&self.dir).await?;
        fs::write(self.dir.join(format!("{}-{}.{}", owner, file_id, ext)), bytes).await?;
        info!("Staged upload {} ({} rows) for user {}", file_id, rows.len(), owner);

        Ok(StagedUpload {
            file_id,
            file_name: file_name.to_string(),
            row_count: rows.len(),
            status: UploadStatus::Pending,
        })
    }

    /// Atomically moves a pending upload out of the pending set and decodes
    /// it. Of two concurrent claims on one id, exactly one succeeds; the
    /// other sees `NotFound`.
    pub async fn claim(&self, owner: i32, file_id: &str) -> Result<ClaimedUpload, StagingError> {
        let pending = self.find(owner, file_id).await?;
        let mut claimed = pending.clone().into_os_string();
        claimed.push(CLAIM_SUFFIX);
        let claimed = PathBuf::from(claimed);

        match fs::rename(&pending, &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StagingError::NotFound(file_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        let upload = ClaimedUpload { pending, claimed, rows: Vec::new() };
        match upload.decode().await {
            Ok(rows) => Ok(ClaimedUpload { rows, ..upload }),
            Err(e) => {
                upload.release().await?;
                Err(e)
            }
        }
    }

    /// Removes a pending upload without importing it. Claimed uploads are
    /// not pending and report `NotFound`.
    pub async fn remove(&self, owner: i32, file_id: &str) -> Result<(), StagingError> {
        let path = self.find(owner, file_id).await?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StagingError::NotFound(file_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        debug!("Removed staged upload {}", path.display());
        Ok(())
    }

    /// Deletes staged files, pending or claimed, last modified more than
    /// `max_age` ago. Returns how many were removed.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize, StagingError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // Confirmed or discarded in the meantime
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if removed > 0 {
            info!("Swept {} expired uploads from {}", removed, self.dir.display());
        }
        Ok(removed)
    }

    /// Finds a pending upload; claimed files never match.
    async fn find(&self, owner: i32, file_id: &str) -> Result<PathBuf, StagingError> {
        // Ids are generated uuids; anything else never names a staged file.
        if Uuid::parse_str(file_id).is_err() {
            return Err(StagingError::NotFound(file_id.to_string()));
        }
        let prefix = format!("{}-{}.", owner, file_id);

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StagingError::NotFound(file_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && !name.ends_with(CLAIM_SUFFIX) {
                return Ok(entry.path());
            }
        }
        Err(StagingError::NotFound(file_id.to_string()))
    }
}

/// An upload taken out of the pending set by [`StagingArea::claim`].
#[derive(Debug)]
pub struct ClaimedUpload {
    pending: PathBuf,
    claimed: PathBuf,
    rows: Vec<serde_json::Value>,
}

impl ClaimedUpload {
    pub fn rows(&self) -> &[serde_json::Value] {
        &self.rows
    }

    /// Deletes the claimed file. The upload is gone for good.
    pub async fn finish(self) -> Result<(), StagingError> {
        fs::remove_file(&self.claimed).await?;
        debug!("Removed claimed upload {}", self.claimed.display());
        Ok(())
    }

    /// Puts the upload back into the pending set so it can be confirmed again.
    pub async fn release(self) -> Result<(), StagingError> {
        fs::rename(&self.claimed, &self.pending).await?;
        debug!("Released upload {}", self.pending.display());
        Ok(())
    }

    async fn decode(&self) -> Result<Vec<serde_json::Value>, StagingError> {
        let bytes = fs::read(&self.claimed).await?;
        let name = self.pending.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        Ok(spreadsheet::decode_file(name, &bytes)?)
    }
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}
