use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::entities::candidate::{self, CandidateRow, READ_COLUMNS};
use crate::error::AppError;
use crate::import::coerce::ALLOWED_SCORES;
use crate::import::NewCandidate;
use crate::prediction::prediction;
use crate::store::active_model;
use crate::AppState;

/// A candidate with its derived prediction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CandidateResponse {
    pub id: i32,
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub skills: Option<String>,
    pub years_of_experience: f64,
    pub score_1: i32,
    pub score_2: i32,
    pub score_3: i32,
    pub score_4: i32,
    /// Joining probability in percent, computed from the four scores
    pub prediction: u8,
}

impl From<CandidateRow> for CandidateResponse {
    fn from(row: CandidateRow) -> Self {
        let prediction = prediction(row.scores());
        Self {
            id: row.id,
            name: row.name,
            role: row.role,
            email: row.email,
            mobile_number: row.mobile_number,
            skills: row.skills,
            years_of_experience: row.years_of_experience,
            score_1: row.score_1,
            score_2: row.score_2,
            score_3: row.score_3,
            score_4: row.score_4,
            prediction,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CandidateListQuery {
    /// Case-insensitive match on name, email or skills
    #[param(required = false)]
    pub search: Option<String>,
    /// Exact role match
    #[param(required = false)]
    pub role: Option<String>,
    #[param(required = false)]
    pub min_experience: Option<f64>,
    /// Only candidates whose prediction is at least this percentage
    #[param(required = false)]
    pub min_prediction: Option<u8>,
    #[serde(default = "default_limit")]
    #[param(required = false)]
    pub limit: u64,
    #[serde(default)]
    #[param(required = false)]
    pub offset: u64,
}

const MAX_PAGE_SIZE: u64 = 1000;

fn default_limit() -> u64 {
    100
}

/// Manual add. Scores default to 0.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateCandidateRequest {
    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub skills: Option<String>,
    #[serde(default)]
    pub years_of_experience: f64,
    #[serde(default)]
    pub score_1: i32,
    #[serde(default)]
    pub score_2: i32,
    #[serde(default)]
    pub score_3: i32,
    #[serde(default)]
    pub score_4: i32,
}

/// Field edit. Absent fields are left alone; an empty string clears a text field.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCandidateRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub skills: Option<String>,
    pub years_of_experience: Option<f64>,
    #[serde(flatten)]
    pub scores: ScoreChanges,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ScoreChanges {
    pub score_1: Option<i32>,
    pub score_2: Option<i32>,
    pub score_3: Option<i32>,
    pub score_4: Option<i32>,
}

impl ScoreChanges {
    fn columns(&self) -> impl Iterator<Item = (candidate::Column, i32)> + '_ {
        [
            (candidate::Column::Score1, self.score_1),
            (candidate::Column::Score2, self.score_2),
            (candidate::Column::Score3, self.score_3),
            (candidate::Column::Score4, self.score_4),
        ]
        .into_iter()
        .filter_map(|(column, score)| score.map(|s| (column, s)))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkScoreRequest {
    pub ids: Vec<i32>,
    pub scores: ScoreChanges,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkScoreResponse {
    pub updated: u64,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Comma separated candidate ids; omit to export every visible candidate
    #[param(required = false)]
    pub ids: Option<String>,
}

fn check_score(value: i32) -> Result<i32, AppError> {
    if ALLOWED_SCORES.contains(&value) {
        Ok(value)
    } else {
        Err(AppError::InvalidRequest(format!(
            "score must be one of {:?}, got {}",
            ALLOWED_SCORES, value
        )))
    }
}

fn check_experience(years: f64) -> Result<f64, AppError> {
    if years.is_finite() && years >= 0.0 {
        Ok(years)
    } else {
        Err(AppError::InvalidRequest("years_of_experience must be a non-negative number".into()))
    }
}

fn check_skills(state: &AppState, skills: &str) -> Result<(), AppError> {
    let max = state.import_settings.skills_max_len;
    if skills.chars().count() > max {
        return Err(AppError::InvalidRequest(format!("skills may be at most {} characters", max)));
    }
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Restricts a statement to the caller's rows when the schema has ownership.
fn owner_condition(state: &AppState, auth: &AuthUser) -> Condition {
    let mut condition = Condition::all();
    if state.import_settings.schema_has_ownership {
        condition = condition.add(candidate::Column::OwnerId.eq(auth.id));
    }
    condition
}

fn scoped_select(state: &AppState, auth: &AuthUser) -> Select<candidate::Entity> {
    candidate::Entity::find()
        .select_only()
        .columns(READ_COLUMNS)
        .filter(owner_condition(state, auth))
}

async fn fetch_one(state: &AppState, auth: &AuthUser, id: i32) -> Result<CandidateResponse, AppError> {
    scoped_select(state, auth)
        .filter(candidate::Column::Id.eq(id))
        .into_model::<CandidateRow>()
        .one(&state.db)
        .await?
        .map(CandidateResponse::from)
        .ok_or_else(|| AppError::NotFound(format!("candidate {}", id)))
}

/// List candidates visible to the caller
#[utoipa::path(
    get,
    path = "/api/candidates",
    tag = "Candidates",
    params(CandidateListQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Candidates with predictions", body = Vec<CandidateResponse>),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[tracing::instrument(skip(state, query))]
pub async fn list_candidates(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CandidateListQuery>,
) -> Result<Json<Vec<CandidateResponse>>, AppError> {
    let mut select = scoped_select(&state, &auth);

    if let Some(search) = blank_to_none(query.search) {
        let pattern = format!("%{}%", search.to_lowercase());
        let lower_like = |column: candidate::Column| -> SimpleExpr {
            Expr::expr(Func::lower(Expr::col(column))).like(pattern.as_str())
        };
        select = select.filter(
            Condition::any()
                .add(lower_like(candidate::Column::Name))
                .add(lower_like(candidate::Column::Email))
                .add(lower_like(candidate::Column::Skills)),
        );
    }
    if let Some(role) = blank_to_none(query.role) {
        select = select.filter(candidate::Column::Role.eq(role));
    }
    if let Some(min) = query.min_experience {
        select = select.filter(candidate::Column::YearsOfExperience.gte(min));
    }

    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    // Prediction is derived, so only without that filter can the database page
    if query.min_prediction.is_none() {
        select = select.limit(limit).offset(query.offset);
    }

    let rows = select
        .order_by_asc(candidate::Column::Id)
        .into_model::<CandidateRow>()
        .all(&state.db)
        .await?;

    let candidates = rows.into_iter().map(CandidateResponse::from);
    let candidates: Vec<CandidateResponse> = match query.min_prediction {
        None => candidates.collect(),
        Some(min_prediction) => candidates
            .filter(|c| c.prediction >= min_prediction)
            .skip(query.offset as usize)
            .take(limit as usize)
            .collect(),
    };

    Ok(Json(candidates))
}

/// Read one candidate
#[utoipa::path(
    get,
    path = "/api/candidates/{id}",
    tag = "Candidates",
    params(("id" = i32, Path, description = "Candidate id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Candidate", body = CandidateResponse),
        (status = 404, description = "No such candidate for this user")
    )
)]
pub async fn get_candidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<CandidateResponse>, AppError> {
    Ok(Json(fetch_one(&state, &auth, id).await?))
}

/// Add a single candidate
#[utoipa::path(
    post,
    path = "/api/candidates",
    tag = "Candidates",
    request_body = CreateCandidateRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Candidate created", body = CandidateResponse),
        (status = 400, description = "Invalid field value")
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_candidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateCandidateRequest>,
) -> Result<(StatusCode, Json<CandidateResponse>), AppError> {
    let name = blank_to_none(Some(request.name))
        .ok_or_else(|| AppError::InvalidRequest("name is required".into()))?;
    let skills = blank_to_none(request.skills);
    if let Some(skills) = &skills {
        check_skills(&state, skills)?;
    }

    let new = NewCandidate {
        name: Some(name),
        role: blank_to_none(request.role),
        email: blank_to_none(request.email),
        mobile_number: blank_to_none(request.mobile_number),
        skills,
        years_of_experience: check_experience(request.years_of_experience)?,
        scores: [
            check_score(request.score_1)?,
            check_score(request.score_2)?,
            check_score(request.score_3)?,
            check_score(request.score_4)?,
        ],
        owner_id: state.import_settings.schema_has_ownership.then_some(auth.id),
    };

    let inserted = candidate::Entity::insert(active_model(new)).exec(&state.db).await?;
    info!("Created candidate {}", inserted.last_insert_id);

    let created = fetch_one(&state, &auth, inserted.last_insert_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit candidate fields
#[utoipa::path(
    put,
    path = "/api/candidates/{id}",
    tag = "Candidates",
    params(("id" = i32, Path, description = "Candidate id")),
    request_body = UpdateCandidateRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated candidate", body = CandidateResponse),
        (status = 400, description = "Invalid field value"),
        (status = 404, description = "No such candidate for this user")
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn update_candidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateCandidateRequest>,
) -> Result<Json<CandidateResponse>, AppError> {
    let mut update = candidate::Entity::update_many();
    let mut changed = false;

    let text_fields = [
        (candidate::Column::Name, request.name),
        (candidate::Column::Role, request.role),
        (candidate::Column::Email, request.email),
        (candidate::Column::MobileNumber, request.mobile_number),
        (candidate::Column::Skills, request.skills),
    ];
    for (column, value) in text_fields {
        if let Some(value) = value {
            let value = blank_to_none(Some(value));
            if let (candidate::Column::Skills, Some(skills)) = (column, &value) {
                check_skills(&state, skills)?;
            }
            update = update.col_expr(column, Expr::value(value));
            changed = true;
        }
    }
    if let Some(years) = request.years_of_experience {
        update = update.col_expr(candidate::Column::YearsOfExperience, Expr::value(check_experience(years)?));
        changed = true;
    }
    for (column, score) in request.scores.columns() {
        update = update.col_expr(column, Expr::value(check_score(score)?));
        changed = true;
    }

    if changed {
        let result = update
            .filter(candidate::Column::Id.eq(id))
            .filter(owner_condition(&state, &auth))
            .exec(&state.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("candidate {}", id)));
        }
    }

    Ok(Json(fetch_one(&state, &auth, id).await?))
}

/// Delete a candidate
#[utoipa::path(
    delete,
    path = "/api/candidates/{id}",
    tag = "Candidates",
    params(("id" = i32, Path, description = "Candidate id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such candidate for this user")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_candidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let result = candidate::Entity::delete_many()
        .filter(candidate::Column::Id.eq(id))
        .filter(owner_condition(&state, &auth))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("candidate {}", id)));
    }
    info!("Deleted candidate {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Set scores on several candidates at once
#[utoipa::path(
    post,
    path = "/api/candidates/scores",
    tag = "Candidates",
    request_body = BulkScoreRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Number of candidates updated", body = BulkScoreResponse),
        (status = 400, description = "No ids, no scores, or a score outside 0/10/20")
    )
)]
#[tracing::instrument(skip(state, request), fields(ids = request.ids.len()))]
pub async fn bulk_update_scores(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<BulkScoreRequest>,
) -> Result<Json<BulkScoreResponse>, AppError> {
    if request.ids.is_empty() {
        return Err(AppError::InvalidRequest("ids cannot be empty".into()));
    }

    let mut update = candidate::Entity::update_many();
    let mut changed = false;
    for (column, score) in request.scores.columns() {
        update = update.col_expr(column, Expr::value(check_score(score)?));
        changed = true;
    }
    if !changed {
        return Err(AppError::InvalidRequest("no scores given".into()));
    }

    let result = update
        .filter(candidate::Column::Id.is_in(request.ids))
        .filter(owner_condition(&state, &auth))
        .exec(&state.db)
        .await?;
    info!("Bulk score change touched {} candidates", result.rows_affected);

    Ok(Json(BulkScoreResponse {
        updated: result.rows_affected,
    }))
}

/// Export candidates as CSV
#[utoipa::path(
    get,
    path = "/api/candidates/export",
    tag = "Candidates",
    params(ExportQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Malformed id list")
    )
)]
#[tracing::instrument(skip(state, query))]
pub async fn export_candidates(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut select = scoped_select(&state, &auth);
    if let Some(ids) = query.ids.as_deref().filter(|ids| !ids.trim().is_empty()) {
        select = select.filter(candidate::Column::Id.is_in(parse_ids(ids)?));
    }

    let rows: Vec<CandidateResponse> = select
        .order_by_asc(candidate::Column::Id)
        .into_model::<CandidateRow>()
        .all(&state.db)
        .await?
        .into_iter()
        .map(CandidateResponse::from)
        .collect();

    let body = write_csv(&rows)?;
    info!("Exported {} candidates", rows.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"candidates.csv\""),
        ],
        body,
    ))
}

fn parse_ids(raw: &str) -> Result<Vec<i32>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| AppError::InvalidRequest(format!("invalid candidate id: {}", part)))
        })
        .collect()
}

pub(crate) fn write_csv(rows: &[CandidateResponse]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::InternalError(format!("failed to write CSV: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("failed to write CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::InternalError(e.to_string()))
}
