use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use common::ApiResponse;
use model::entities::{
    prelude::{Student, User},
    student, student_section, student_subject, user,
};
use sea_orm::{
    ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::hash_password;
use crate::error::{ApiError, ValidatedJson};
use crate::schemas::AppState;

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    /// One of student, teacher, admin, superadmin
    pub role: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub is_profile_complete: bool,
    pub is_active: bool,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            display_name: model.display_name(),
            id: model.id,
            role: model.role.to_string(),
            username: model.username,
            first_name: model.first_name,
            middle_name: model.middle_name,
            last_name: model.last_name,
            email: model.email,
            is_profile_complete: model.is_profile_complete,
            is_active: model.is_active,
        }
    }
}

/// Request body for provisioning a teacher or administrator
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// "teacher" or "admin"
    pub role: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Request body for provisioning a student account with its profile
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    /// Learner Reference Number
    #[validate(length(min = 1, max = 32))]
    pub lrn: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    pub semester_id: Option<i32>,
    #[serde(default)]
    pub section_ids: Vec<i32>,
    #[serde(default)]
    pub subject_ids: Vec<i32>,
}

/// A student profile with its enrolments
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub student_id: i32,
    pub user: UserResponse,
    pub lrn: Option<String>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    pub semester_id: Option<i32>,
    pub section_ids: Vec<i32>,
    pub subject_ids: Vec<i32>,
}

/// Create a teacher or admin account
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn create_staff_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateStaffRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    trace!("Entering create_staff_user function");

    let role = match request.role.parse::<user::UserRole>() {
        Ok(role @ (user::UserRole::Teacher | user::UserRole::Admin)) => role,
        _ => {
            return Err(ApiError::Validation(format!(
                "Role must be 'teacher' or 'admin', got '{}'",
                request.role
            )));
        }
    };

    let account = user::ActiveModel {
        username: Set(request.username),
        password_hash: Set(hash_password(&request.password)?),
        role: Set(role),
        is_profile_complete: Set(true),
        is_active: Set(true),
        first_name: Set(request.first_name),
        middle_name: Set(request.middle_name),
        last_name: Set(request.last_name),
        email: Set(request.email),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(user_id = account.id, role = %account.role, "Staff user created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            UserResponse::from(account),
            "User created successfully",
        )),
    ))
}

/// Get all users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let users: Vec<UserResponse> = User::find()
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    debug!("Retrieved {} users", users.len());
    Ok(Json(ApiResponse::ok(users, "Users retrieved successfully")))
}

/// Deactivate a user; deactivated users cannot log in
#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/deactivate",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deactivated", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn deactivate_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let account = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {} not found", user_id)))?;

    if account.role == user::UserRole::SuperAdmin {
        return Err(ApiError::Forbidden(
            "Superadmin accounts cannot be deactivated".to_string(),
        ));
    }

    let mut active = account.into_active_model();
    active.is_active = Set(false);
    let account = active.update(&state.db).await?;

    info!(user_id, "User deactivated");
    Ok(Json(ApiResponse::ok(
        UserResponse::from(account),
        "User deactivated successfully",
    )))
}

/// Create a student account with profile and enrolments
#[utoipa::path(
    post,
    path = "/api/admin/students",
    tag = "admin",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created successfully", body = ApiResponse<StudentResponse>),
        (status = 400, description = "Invalid request or unknown reference", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn create_student(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateStudentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StudentResponse>>), ApiError> {
    let password_hash = hash_password(&request.password)?;

    let txn = state.db.begin().await?;
    let account = user::ActiveModel {
        username: Set(request.username),
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

    let profile = student::ActiveModel {
        user_id: Set(account.id),
        lrn: Set(request.lrn),
        sex: Set(request.sex),
        birth_date: Set(request.birth_date),
        strand_id: Set(request.strand_id),
        year_level_id: Set(request.year_level_id),
        semester_id: Set(request.semester_id),
        grades: Set("[]".to_string()),
        revision: Set(0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for section_id in &request.section_ids {
        student_section::ActiveModel {
            student_id: Set(profile.id),
            section_id: Set(*section_id),
        }
        .insert(&txn)
        .await?;
    }
    for subject_id in &request.subject_ids {
        student_subject::ActiveModel {
            student_id: Set(profile.id),
            subject_id: Set(*subject_id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    info!(
        student_id = profile.id,
        sections = request.section_ids.len(),
        subjects = request.subject_ids.len(),
        "Student provisioned"
    );

    let response = StudentResponse {
        student_id: profile.id,
        user: UserResponse::from(account),
        lrn: profile.lrn,
        strand_id: profile.strand_id,
        year_level_id: profile.year_level_id,
        semester_id: profile.semester_id,
        section_ids: request.section_ids,
        subject_ids: request.subject_ids,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "Student created successfully")),
    ))
}

/// Get all student profiles
#[utoipa::path(
    get,
    path = "/api/admin/students",
    tag = "admin",
    responses(
        (status = 200, description = "Students retrieved successfully", body = ApiResponse<Vec<StudentResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<StudentResponse>>>, ApiError> {
    let rows = Student::find()
        .order_by_asc(student::Column::Id)
        .find_also_related(User)
        .all(&state.db)
        .await?;

    let sections = student_section::Entity::find().all(&state.db).await?;
    let subjects = student_subject::Entity::find().all(&state.db).await?;

    let students: Vec<StudentResponse> = rows
        .into_iter()
        .filter_map(|(profile, account)| {
            let account = account?;
            Some(StudentResponse {
                student_id: profile.id,
                user: UserResponse::from(account),
                section_ids: sections
                    .iter()
                    .filter(|row| row.student_id == profile.id)
                    .map(|row| row.section_id)
                    .collect(),
                subject_ids: subjects
                    .iter()
                    .filter(|row| row.student_id == profile.id)
                    .map(|row| row.subject_id)
                    .collect(),
                lrn: profile.lrn,
                strand_id: profile.strand_id,
                year_level_id: profile.year_level_id,
                semester_id: profile.semester_id,
            })
        })
        .collect();

    debug!("Retrieved {} students", students.len());
    Ok(Json(ApiResponse::ok(
        students,
        "Students retrieved successfully",
    )))
}
