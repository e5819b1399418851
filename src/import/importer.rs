use async_trait::async_trait;
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::coerce::{self, display_raw, DiagnosticKind};
use super::reconciler::{CandidateField, FieldAliases};

/// Default number of rows per insert statement.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// A candidate ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub skills: Option<String>,
    pub years_of_experience: f64,
    pub scores: [i32; 4],
    pub owner_id: Option<i32>,
}

/// Storage collaborator the importer writes through.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Inserts one batch and returns the affected-row count, if the backend
    /// reports one.
    async fn insert_batch(&self, batch: Vec<NewCandidate>) -> Result<Option<u64>, DbErr>;
}

#[derive(Debug, Clone, Copy)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub skills_max_len: usize,
    /// Whether the destination table has an `owner_id` column.
    pub schema_has_ownership: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skills_max_len: 1000,
            schema_has_ownership: false,
        }
    }
}

/// One value that was defaulted, truncated or flagged during coercion.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RowDiagnostic {
    /// 1-based position of the row in the submitted sequence
    pub row: usize,
    pub field: CandidateField,
    pub kind: DiagnosticKind,
    /// The cell as it was submitted
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ImportReport {
    /// Rows actually inserted
    pub inserted_count: u64,
    /// Entries that were not key/value rows and were ignored
    pub skipped_rows: usize,
    pub diagnostics: Vec<RowDiagnostic>,
}

#[derive(Debug)]
pub enum ImportError {
    /// Nothing in the input could be turned into a candidate.
    NoValidRows,
    /// A batch insert failed. Batches before it stay committed.
    ImportFailed { inserted_before_failure: u64, source: DbErr },
}

impl ImportError {
    /// Rows that are in the database despite the error.
    pub fn committed_rows(&self) -> u64 {
        match self {
            ImportError::NoValidRows => 0,
            ImportError::ImportFailed { inserted_before_failure, .. } => *inserted_before_failure,
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NoValidRows => write!(f, "No valid rows to import"),
            ImportError::ImportFailed { inserted_before_failure, source } => write!(
                f,
                "Import failed after {} rows were inserted: {}",
                inserted_before_failure, source
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::NoValidRows => None,
            ImportError::ImportFailed { source, .. } => Some(source),
        }
    }
}

/// Turns reconciled rows into candidates and writes them in batches.
pub struct Importer<'a, S: ?Sized> {
    store: &'a S,
    aliases: &'a FieldAliases,
    settings: ImportSettings,
}

impl<'a, S: CandidateStore + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a S, aliases: &'a FieldAliases, settings: ImportSettings) -> Self {
        Self { store, aliases, settings }
    }

    /// Imports `rows`, stamping `acting_user` as owner when the schema has an
    /// ownership column.
    #[tracing::instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub async fn import(&self, rows: &[Value], acting_user: Option<i32>) -> Result<ImportReport, ImportError> {
        let owner_id = if self.settings.schema_has_ownership {
            acting_user
        } else {
            None
        };

        let mut candidates = Vec::with_capacity(rows.len());
        let mut diagnostics = Vec::new();
        let mut skipped_rows = 0;

        for (index, row) in rows.iter().enumerate() {
            match row {
                Value::Object(map) => {
                    let candidate = self.build_candidate(index + 1, map, owner_id, &mut diagnostics);
                    candidates.push(candidate);
                }
                other => {
                    debug!("Skipping row {}: not a key/value row ({})", index + 1, other);
                    skipped_rows += 1;
                }
            }
        }

        if candidates.is_empty() {
            warn!("Import rejected: none of {} rows were usable", rows.len());
            return Err(ImportError::NoValidRows);
        }

        let batch_size = self.settings.batch_size.max(1);
        let mut inserted_count = 0u64;
        let mut remaining = candidates.into_iter().peekable();
        let mut batch_number = 0;

        while remaining.peek().is_some() {
            let batch: Vec<NewCandidate> = remaining.by_ref().take(batch_size).collect();
            let batch_len = batch.len() as u64;
            batch_number += 1;

            match self.store.insert_batch(batch).await {
                Ok(affected) => {
                    let affected = affected.unwrap_or(batch_len);
                    debug!("Batch {} inserted {} rows", batch_number, affected);
                    inserted_count += affected;
                }
                Err(source) => {
                    warn!(
                        "Batch {} failed after {} rows were committed: {}",
                        batch_number, inserted_count, source
                    );
                    return Err(ImportError::ImportFailed {
                        inserted_before_failure: inserted_count,
                        source,
                    });
                }
            }
        }

        info!(
            "Import finished. Inserted: {}, Skipped: {}, Diagnostics: {}",
            inserted_count,
            skipped_rows,
            diagnostics.len()
        );

        Ok(ImportReport {
            inserted_count,
            skipped_rows,
            diagnostics,
        })
    }

    fn build_candidate(
        &self,
        row_number: usize,
        row: &Map<String, Value>,
        owner_id: Option<i32>,
        diagnostics: &mut Vec<RowDiagnostic>,
    ) -> NewCandidate {
        let lookup = |field: CandidateField| self.aliases.resolve(row, field);
        let mut note = |field: CandidateField, kind: Option<DiagnosticKind>| {
            if let Some(kind) = kind {
                diagnostics.push(RowDiagnostic {
                    row: row_number,
                    field,
                    kind,
                    raw: lookup(field).map(display_raw),
                });
            }
        };

        let experience = coerce::to_experience(lookup(CandidateField::YearsOfExperience));
        note(CandidateField::YearsOfExperience, experience.diagnostic);

        let skills = coerce::to_skills(lookup(CandidateField::Skills), self.settings.skills_max_len);
        note(CandidateField::Skills, skills.diagnostic);

        let mut scores = [0; 4];
        let score_fields = [
            CandidateField::Score1,
            CandidateField::Score2,
            CandidateField::Score3,
            CandidateField::Score4,
        ];
        for (slot, field) in scores.iter_mut().zip(score_fields) {
            let score = coerce::to_score(lookup(field));
            note(field, score.diagnostic);
            *slot = score.value;
        }

        NewCandidate {
            name: coerce::to_text(lookup(CandidateField::Name)),
            role: coerce::to_text(lookup(CandidateField::Role)),
            email: coerce::to_text(lookup(CandidateField::Email)),
            mobile_number: coerce::to_text(lookup(CandidateField::MobileNumber)),
            skills: skills.value,
            years_of_experience: experience.value,
            scores,
            owner_id,
        }
    }
}
