// Spreadsheet import pipeline: decode -> reconcile -> coerce -> batch insert
pub mod coerce;
pub mod importer;
pub mod reconciler;
pub mod spreadsheet;
pub mod staging;

pub use importer::{CandidateStore, ImportError, ImportReport, ImportSettings, Importer, NewCandidate, RowDiagnostic};
pub use reconciler::{CandidateField, FieldAliases};
pub use staging::{ClaimedUpload, StagedUpload, StagingArea, StagingError, UploadStatus};
