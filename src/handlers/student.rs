use axum::{Extension, extract::State, response::Json};
use chrono::NaiveDate;
use common::{AcademicRecord, ApiResponse};
use model::entities::{
    prelude::{Student, User},
    student, user,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ValidatedJson};
use crate::handlers::grades::{cached_academic_record, student_of_user};
use crate::schemas::AppState;

/// Profile fields a student may edit. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub lrn: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_relationship: Option<String>,
    pub guardian_contact: Option<String>,
    pub birthplace_province: Option<String>,
    pub birthplace_municipality: Option<String>,
    pub birthplace_barangay: Option<String>,
}

/// The caller's own academic record
#[utoipa::path(
    get,
    path = "/api/student/grades",
    tag = "student",
    responses(
        (status = 200, description = "Academic record", body = ApiResponse<AcademicRecord>),
        (status = 404, description = "No student profile", body = ErrorResponse)
    )
)]
#[instrument(skip(state, caller), fields(user_id = caller.id))]
pub async fn my_grades(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<AcademicRecord>>, ApiError> {
    let profile = student_of_user(&state, caller.id).await?;
    let academic_record = cached_academic_record(&state, profile.id).await?;
    Ok(Json(ApiResponse::ok(
        academic_record,
        "Grades retrieved successfully",
    )))
}

/// Update the caller's demographic, guardian and birthplace details
///
/// Marks the profile as complete.
#[utoipa::path(
    put,
    path = "/api/student/profile",
    tag = "student",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<AcademicRecord>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "No student profile", body = ErrorResponse)
    )
)]
#[instrument(skip(state, caller, request), fields(user_id = caller.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<AcademicRecord>>, ApiError> {
    let profile = student_of_user(&state, caller.id).await?;
    let account = User::find_by_id(caller.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {} not found", caller.id)))?;
    let student_id = profile.id;

    let mut account: user::ActiveModel = account.into_active_model();
    if request.first_name.is_some() {
        account.first_name = Set(request.first_name);
    }
    if request.middle_name.is_some() {
        account.middle_name = Set(request.middle_name);
    }
    if request.last_name.is_some() {
        account.last_name = Set(request.last_name);
    }
    if request.email.is_some() {
        account.email = Set(request.email);
    }
    account.is_profile_complete = Set(true);

    let mut profile = profile.into_active_model();
    macro_rules! apply {
        ($($field:ident),* $(,)?) => {
            $(
                if request.$field.is_some() {
                    profile.$field = Set(request.$field);
                }
            )*
        };
    }
    apply!(
        lrn,
        sex,
        birth_date,
        address,
        contact_number,
        guardian_name,
        guardian_relationship,
        guardian_contact,
        birthplace_province,
        birthplace_municipality,
        birthplace_barangay,
    );

    let txn = state.db.begin().await?;
    account.update(&txn).await?;
    profile.update(&txn).await?;
    // Moves the cached record key along with the profile.
    Student::update_many()
        .col_expr(
            student::Column::Revision,
            Expr::col(student::Column::Revision).add(1),
        )
        .filter(student::Column::Id.eq(student_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(student_id, "Student profile updated");

    let academic_record = cached_academic_record(&state, student_id).await?;
    Ok(Json(ApiResponse::ok(
        academic_record,
        "Profile updated successfully",
    )))
}
