use axum::{
    Extension,
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
};
use common::{ApiResponse, SectionRoster, StudentSummary, SubjectGradeDto};
use compute::{grading, roster};
use model::gradebook::ComponentKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ValidatedJson};
use crate::schemas::AppState;

/// Request body for recording a component score
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertGradeRequest {
    pub student_id: i32,
    pub subject_id: i32,
    pub semester_id: i32,
    /// "midterm" or "finals"
    #[validate(length(min = 1))]
    pub grade_type: String,
    /// Score between 0 and 100
    pub grade_value: f64,
}

/// Request body for clearing a component score
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClearGradeRequest {
    pub student_id: i32,
    pub subject_id: i32,
    pub semester_id: i32,
    /// "midterm" or "finals"
    #[validate(length(min = 1))]
    pub grade_type: String,
}

/// The stored subject grade after a write
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub student_id: i32,
    pub subject_id: i32,
    pub semester_id: i32,
    pub grade_type: String,
    /// The value written; absent when the component was cleared
    pub grade_value: Option<f64>,
    #[serde(flatten)]
    pub grade: SubjectGradeDto,
}

/// Query parameters for the subject roster
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStudentsQuery {
    pub subject_id: Option<i32>,
    pub semester_id: Option<i32>,
}

fn parse_kind(grade_type: &str) -> Result<ComponentKind, ApiError> {
    grade_type.parse::<ComponentKind>().map_err(ApiError::Validation)
}

/// Record a midterm or finals score
#[utoipa::path(
    post,
    path = "/api/teacher/grades",
    tag = "teacher",
    request_body = UpsertGradeRequest,
    responses(
        (status = 200, description = "Grade updated", body = ApiResponse<GradeResponse>),
        (status = 400, description = "Missing field or score out of range", body = ErrorResponse),
        (status = 404, description = "Student, subject or semester not found", body = ErrorResponse),
        (status = 409, description = "Grades changed concurrently; retry", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, caller), fields(teacher_id = caller.id))]
pub async fn upsert_grade(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<UpsertGradeRequest>,
) -> Result<Json<ApiResponse<GradeResponse>>, ApiError> {
    let kind = parse_kind(&request.grade_type)?;

    let grade = grading::upsert_component_score(
        &state.db,
        request.student_id,
        request.subject_id,
        request.semester_id,
        kind,
        request.grade_value,
    )
    .await?;

    info!(
        student_id = request.student_id,
        subject_id = request.subject_id,
        "Grade recorded by teacher"
    );
    let response = GradeResponse {
        student_id: request.student_id,
        subject_id: request.subject_id,
        semester_id: request.semester_id,
        grade_type: kind.to_string(),
        grade_value: Some(request.grade_value),
        grade: grading::grade_dto(&grade),
    };
    Ok(Json(ApiResponse::ok(response, "Grade updated successfully")))
}

/// Clear a midterm or finals score
#[utoipa::path(
    delete,
    path = "/api/teacher/grades",
    tag = "teacher",
    request_body = ClearGradeRequest,
    responses(
        (status = 200, description = "Grade cleared", body = ApiResponse<GradeResponse>),
        (status = 400, description = "Missing field", body = ErrorResponse),
        (status = 404, description = "Student, subject or semester not found", body = ErrorResponse),
        (status = 409, description = "Grades changed concurrently; retry", body = ErrorResponse)
    )
)]
#[instrument(skip(state, caller), fields(teacher_id = caller.id))]
pub async fn clear_grade(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<ClearGradeRequest>,
) -> Result<Json<ApiResponse<GradeResponse>>, ApiError> {
    let kind = parse_kind(&request.grade_type)?;

    let grade = grading::clear_component_score(
        &state.db,
        request.student_id,
        request.subject_id,
        request.semester_id,
        kind,
    )
    .await?;

    let response = GradeResponse {
        student_id: request.student_id,
        subject_id: request.subject_id,
        semester_id: request.semester_id,
        grade_type: kind.to_string(),
        grade_value: None,
        grade: grading::grade_dto(&grade),
    };
    Ok(Json(ApiResponse::ok(response, "Grade cleared successfully")))
}

/// Students of a subject in a semester, flagged by advisory membership
#[utoipa::path(
    get,
    path = "/api/teacher/subject-students",
    tag = "teacher",
    params(SubjectStudentsQuery),
    responses(
        (status = 200, description = "Roster retrieved", body = ApiResponse<Vec<StudentSummary>>),
        (status = 400, description = "subjectId or semesterId missing", body = ErrorResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, caller, query), fields(teacher_id = caller.id))]
pub async fn subject_students(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    query: Result<Query<SubjectStudentsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<StudentSummary>>>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let (Some(subject_id), Some(semester_id)) = (query.subject_id, query.semester_id) else {
        return Err(ApiError::Validation(
            "Both subjectId and semesterId are required".to_string(),
        ));
    };

    let students = roster::roster_for_subject(&state.db, caller.id, subject_id, semester_id).await?;
    debug!(subject_id, semester_id, count = students.len(), "Subject roster served");
    Ok(Json(ApiResponse::ok(
        students,
        "Students retrieved successfully",
    )))
}

/// Sections assigned to the teacher with their students
#[utoipa::path(
    get,
    path = "/api/teacher/sections",
    tag = "teacher",
    responses(
        (status = 200, description = "Sections retrieved", body = ApiResponse<Vec<SectionRoster>>)
    )
)]
#[instrument(skip(state, caller), fields(teacher_id = caller.id))]
pub async fn teacher_sections(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<SectionRoster>>>, ApiError> {
    let sections = roster::roster_for_sections(&state.db, caller.id).await?;
    Ok(Json(ApiResponse::ok(
        sections,
        "Sections retrieved successfully",
    )))
}
