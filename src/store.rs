use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, Set, Statement,
};
use tracing::{info, warn};

use crate::config::OwnershipMode;
use crate::entities::candidate;
use crate::import::{CandidateStore, NewCandidate};

/// Writes imported candidates through sea-orm.
#[derive(Clone)]
pub struct SeaOrmCandidateStore {
    db: DatabaseConnection,
}

impl SeaOrmCandidateStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Builds the insert model. `owner_id` stays unset when there is no owner so
/// the statement also works on tables without that column.
pub fn active_model(candidate: NewCandidate) -> candidate::ActiveModel {
    let [score_1, score_2, score_3, score_4] = candidate.scores;
    candidate::ActiveModel {
        id: NotSet,
        name: Set(candidate.name),
        role: Set(candidate.role),
        email: Set(candidate.email),
        mobile_number: Set(candidate.mobile_number),
        skills: Set(candidate.skills),
        years_of_experience: Set(candidate.years_of_experience),
        score_1: Set(score_1),
        score_2: Set(score_2),
        score_3: Set(score_3),
        score_4: Set(score_4),
        owner_id: match candidate.owner_id {
            Some(owner) => Set(Some(owner)),
            None => NotSet,
        },
    }
}

#[async_trait]
impl CandidateStore for SeaOrmCandidateStore {
    async fn insert_batch(&self, batch: Vec<NewCandidate>) -> Result<Option<u64>, DbErr> {
        let models: Vec<candidate::ActiveModel> = batch.into_iter().map(active_model).collect();
        let affected = candidate::Entity::insert_many(models)
            .exec_without_returning(&self.db)
            .await?;
        Ok(Some(affected))
    }
}

/// Checks once whether `candidates.owner_id` exists. A failed probe is
/// treated as "no ownership column".
pub async fn probe_ownership_column(db: &DatabaseConnection) -> bool {
    let backend = db.get_database_backend();
    let stmt = Statement::from_sql_and_values(
        backend,
        "SELECT 1 AS present FROM information_schema.columns WHERE table_name = $1 AND column_name = $2",
        ["candidates".into(), "owner_id".into()],
    );
    match db.query_one(stmt).await {
        Ok(row) => row.is_some(),
        Err(e) => {
            warn!("Ownership column probe failed, assuming no ownership column: {}", e);
            false
        }
    }
}

pub async fn resolve_ownership(db: &DatabaseConnection, mode: OwnershipMode) -> bool {
    let enabled = match mode {
        OwnershipMode::Enabled => true,
        OwnershipMode::Disabled => false,
        OwnershipMode::Auto => probe_ownership_column(db).await,
    };
    info!("Candidate ownership scoping: {}", if enabled { "enabled" } else { "disabled" });
    enabled
}
