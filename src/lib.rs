use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod import;
pub mod prediction;
pub mod routes;
pub mod store;

use crate::auth::TokenConfig;
use crate::config::AppConfig;
use crate::import::{FieldAliases, ImportSettings, StagingArea};

/// Largest accepted request body (spreadsheet uploads included).
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub tokens: Arc<TokenConfig>,
    pub aliases: Arc<FieldAliases>,
    /// Batch size, skills limit and the ownership flag resolved at startup
    pub import_settings: ImportSettings,
    pub staging: Arc<StagingArea>,
    /// Requests per minute per client IP; 0 disables the limiter
    pub rate_limit_burst: u32,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &AppConfig, schema_has_ownership: bool) -> Self {
        Self {
            db,
            tokens: Arc::new(TokenConfig {
                secret: config.jwt_secret.clone(),
                ttl_hours: config.token_ttl_hours,
            }),
            aliases: Arc::new(FieldAliases::default()),
            import_settings: ImportSettings {
                batch_size: config.import_batch_size,
                skills_max_len: config.skills_max_len,
                schema_has_ownership,
            },
            staging: Arc::new(StagingArea::new(config.upload_dir.clone())),
            rate_limit_burst: config.rate_limit_burst,
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HIRETRACK API",
        version = "0.1.0",
    ),
    modifiers(&BearerAuth),
    paths(
        health_check,
        routes::auth::signup,
        routes::auth::login,
        routes::auth::reset_password,
        routes::candidates::list_candidates,
        routes::candidates::get_candidate,
        routes::candidates::create_candidate,
        routes::candidates::update_candidate,
        routes::candidates::delete_candidate,
        routes::candidates::bulk_update_scores,
        routes::candidates::export_candidates,
        routes::imports::import_rows,
        routes::imports::upload_spreadsheet,
        routes::imports::confirm_upload,
        routes::imports::discard_upload,
    ),
    components(schemas(
        routes::auth::SignupRequest,
        routes::auth::LoginRequest,
        routes::auth::LoginResponse,
        routes::auth::ResetPasswordRequest,
        routes::auth::UserResponse,
        routes::candidates::CandidateResponse,
        routes::candidates::CreateCandidateRequest,
        routes::candidates::UpdateCandidateRequest,
        routes::candidates::ScoreChanges,
        routes::candidates::BulkScoreRequest,
        routes::candidates::BulkScoreResponse,
        routes::imports::ImportRowsRequest,
        routes::imports::ConfirmUploadResponse,
        import::ImportReport,
        import::RowDiagnostic,
        import::CandidateField,
        import::coerce::DiagnosticKind,
        import::StagedUpload,
        import::UploadStatus,
    ))
)]
pub struct ApiDoc;

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let api_doc = ApiDoc::openapi();

    // --- Define API routes separately ---
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/signup", post(routes::signup))
        .route("/api/auth/login", post(routes::login))
        .route("/api/auth/reset-password", post(routes::reset_password))
        .route(
            "/api/candidates",
            get(routes::list_candidates).post(routes::create_candidate),
        )
        .route("/api/candidates/export", get(routes::export_candidates))
        .route("/api/candidates/import", post(routes::import_rows))
        .route("/api/candidates/scores", post(routes::bulk_update_scores))
        .route(
            "/api/candidates/{id}",
            get(routes::get_candidate)
                .put(routes::update_candidate)
                .delete(routes::delete_candidate),
        )
        .route("/api/uploads", post(routes::upload_spreadsheet))
        .route("/api/uploads/{file_id}/confirm", post(routes::confirm_upload))
        .route("/api/uploads/{file_id}", delete(routes::discard_upload))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // --- Rate limiting, unless disabled ---
    let api_routes = match NonZeroU32::new(state.rate_limit_burst) {
        Some(burst) => {
            let governor_conf = GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .period(std::time::Duration::from_secs(60) / burst.get())
                .burst_size(burst.get())
                .finish()
                .map(Arc::new);
            match governor_conf {
                Some(config) => api_routes.layer(GovernorLayer { config }),
                None => {
                    tracing::warn!("Invalid rate limit configuration; rate limiting disabled");
                    api_routes
                }
            }
        }
        None => api_routes,
    };

    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", api_doc);

    // --- Build the final application router ---
    Router::new()
        .merge(api_routes.with_state(state))
        .merge(docs_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
