use axum::{extract::State, http::StatusCode, Json};
use regex::Regex;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::entities::user;
use crate::error::AppError;
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 8;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub user: UserResponse,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
        }
    }
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Create a recruiter account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid email, name or password"),
        (status = 409, description = "Email already registered")
    )
)]
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let email = request.email.trim().to_lowercase();
    let name = request.name.trim().to_string();

    if name.is_empty() {
        return Err(AppError::InvalidRequest("name is required".into()));
    }
    if !email_pattern().is_match(&email) {
        return Err(AppError::InvalidRequest("email is not valid".into()));
    }
    check_password(&request.password)?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let am = user::ActiveModel {
        name: Set(name.clone()),
        email: Set(email.clone()),
        password_hash: Set(hash_password(&request.password)),
        // id and created_at are set by the database
        ..Default::default()
    };
    let inserted = user::Entity::insert(am).exec(&state.db).await?;
    info!("Created user {}", inserted.last_insert_id);

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: inserted.last_insert_id,
            name,
            email,
        }),
    ))
}

/// Exchange email and password for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = request.email.trim().to_lowercase();
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?;

    let user = match found {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            warn!("Failed sign-in attempt");
            return Err(AppError::Unauthorized("Invalid email or password".into()));
        }
    };

    let token = issue_token(&state.tokens, user.id)?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Change the signed-in user's password
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "New password too short"),
        (status = 401, description = "Missing token or wrong current password")
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn reset_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    check_password(&request.new_password)?;

    let user = user::Entity::find_by_id(auth.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".into()))?;

    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(AppError::Unauthorized("current password is incorrect".into()));
    }

    let mut am: user::ActiveModel = user.into();
    am.password_hash = Set(hash_password(&request.new_password));
    am.update(&state.db).await?;
    info!("Password changed for user {}", auth.id);

    Ok(StatusCode::NO_CONTENT)
}
