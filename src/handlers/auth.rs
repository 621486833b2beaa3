use axum::{
    Extension,
    extract::State,
    http::{HeaderMap, header},
    response::Json,
};
use common::ApiResponse;
use model::entities::{prelude::User, student, user};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{
    AuthenticatedUser, expired_cookie, hash_password, issue_token, session_cookie, verify_password,
};
use crate::error::{ApiError, ValidatedJson};
use crate::handlers::users::UserResponse;
use crate::schemas::AppState;

/// Self-registration of a student account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Username (must be unique)
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Register a new student account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering register function");

    let existing = User::find()
        .filter(user::Column::Username.eq(&request.username))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(format!(
            "Username '{}' already exists",
            request.username
        )));
    }

    let password_hash = hash_password(&request.password)?;

    let txn = state.db.begin().await?;
    let account = user::ActiveModel {
        username: Set(request.username.clone()),
        password_hash: Set(password_hash),
        role: Set(user::UserRole::Student),
        is_profile_complete: Set(false),
        is_active: Set(true),
        first_name: Set(request.first_name),
        middle_name: Set(request.middle_name),
        last_name: Set(request.last_name),
        email: Set(request.email),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    student::ActiveModel {
        user_id: Set(account.id),
        grades: Set("[]".to_string()),
        revision: Set(0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(user_id = account.id, "Student account registered");
    Ok(Json(ApiResponse::ok(
        UserResponse::from(account),
        "Registration successful",
    )))
}

/// Log in and receive a session cookie
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = ApiResponse<UserResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(HeaderMap, Json<ApiResponse<UserResponse>>), ApiError> {
    let invalid = || ApiError::Unauthenticated("Invalid username or password".to_string());

    let account = User::find()
        .filter(user::Column::Username.eq(&request.username))
        .one(&state.db)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &account.password_hash) {
        warn!("Failed login attempt");
        return Err(invalid());
    }
    if !account.is_active {
        warn!(user_id = account.id, "Login attempt on inactive account");
        return Err(ApiError::Unauthenticated("Account is inactive".to_string()));
    }

    let token = issue_token(&state.config, &account)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&state.config, &token)?);

    info!(user_id = account.id, role = %account.role, "User logged in");
    Ok((
        headers,
        Json(ApiResponse::ok(UserResponse::from(account), "Login successful")),
    ))
}

/// Log out by expiring the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiResponse<String>)
    )
)]
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<ApiResponse<String>>), ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, expired_cookie(&state.config)?);
    debug!("Session cookie cleared");
    Ok((headers, Json(ApiResponse::ok(String::new(), "Logged out"))))
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let account = User::find_by_id(caller.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {} not found", caller.id)))?;

    Ok(Json(ApiResponse::ok(
        UserResponse::from(account),
        "User retrieved successfully",
    )))
}
