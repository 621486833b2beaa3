//! Administrative maintenance of reference data: strands, year levels,
//! semesters, subjects and sections.
//!
//! Every write drops all cached academic records, since any of these names
//! may appear in a formatted record.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use common::ApiResponse;
use model::entities::{
    prelude::{Section, SectionTeacher, Semester, Strand, Subject, SubjectSection, SubjectTeacher, User, YearLevel},
    section, section_teacher, semester, strand, student_section, subject, subject_section,
    subject_teacher, user, year_level,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DeleteResult, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{ApiError, ValidatedJson};
use crate::handlers::grades::invalidate_all_records;
use crate::schemas::AppState;

fn ensure_deleted(result: DeleteResult, kind: &str, id: i32) -> Result<(), ApiError> {
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound(format!("{} with id {} not found", kind, id)));
    }
    Ok(())
}

/// Fails unless every id names an active teacher.
async fn ensure_teachers(txn: &DatabaseTransaction, teacher_ids: &[i32]) -> Result<(), ApiError> {
    for teacher_id in teacher_ids {
        match User::find_by_id(*teacher_id).one(txn).await? {
            Some(account) if account.role == user::UserRole::Teacher && account.is_active => {}
            _ => {
                return Err(ApiError::Validation(format!(
                    "User {} is not an active teacher",
                    teacher_id
                )));
            }
        }
    }
    Ok(())
}

// ===================== Strands & year levels =====================

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStrandRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateYearLevelRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StrandResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<strand::Model> for StrandResponse {
    fn from(model: strand::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YearLevelResponse {
    pub id: i32,
    pub name: String,
}

impl From<year_level::Model> for YearLevelResponse {
    fn from(model: year_level::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Create a strand
#[utoipa::path(
    post,
    path = "/api/admin/strands",
    tag = "admin",
    request_body = CreateStrandRequest,
    responses(
        (status = 201, description = "Strand created", body = ApiResponse<StrandResponse>),
        (status = 409, description = "Name already used", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_strand(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateStrandRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StrandResponse>>), ApiError> {
    let model = strand::ActiveModel {
        name: Set(request.name),
        description: Set(request.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(strand_id = model.id, "Strand created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(StrandResponse::from(model), "Strand created successfully")),
    ))
}

/// Get all strands
#[utoipa::path(
    get,
    path = "/api/admin/strands",
    tag = "admin",
    responses(
        (status = 200, description = "Strands retrieved", body = ApiResponse<Vec<StrandResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_strands(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<StrandResponse>>>, ApiError> {
    let strands = Strand::find()
        .order_by_asc(strand::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(StrandResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(strands, "Strands retrieved successfully")))
}

/// Delete a strand
#[utoipa::path(
    delete,
    path = "/api/admin/strands/{strand_id}",
    tag = "admin",
    params(("strand_id" = i32, Path, description = "Strand ID")),
    responses(
        (status = 204, description = "Strand deleted"),
        (status = 404, description = "Strand not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_strand(
    Path(strand_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    ensure_deleted(Strand::delete_by_id(strand_id).exec(&state.db).await?, "Strand", strand_id)?;
    invalidate_all_records(&state);
    info!(strand_id, "Strand deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Create a year level
#[utoipa::path(
    post,
    path = "/api/admin/year-levels",
    tag = "admin",
    request_body = CreateYearLevelRequest,
    responses(
        (status = 201, description = "Year level created", body = ApiResponse<YearLevelResponse>),
        (status = 409, description = "Name already used", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_year_level(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateYearLevelRequest>,
) -> Result<(StatusCode, Json<ApiResponse<YearLevelResponse>>), ApiError> {
    let model = year_level::ActiveModel {
        name: Set(request.name),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(year_level_id = model.id, "Year level created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            YearLevelResponse::from(model),
            "Year level created successfully",
        )),
    ))
}

/// Get all year levels
#[utoipa::path(
    get,
    path = "/api/admin/year-levels",
    tag = "admin",
    responses(
        (status = 200, description = "Year levels retrieved", body = ApiResponse<Vec<YearLevelResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_year_levels(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<YearLevelResponse>>>, ApiError> {
    let levels = YearLevel::find()
        .order_by_asc(year_level::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(YearLevelResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(levels, "Year levels retrieved successfully")))
}

/// Delete a year level
#[utoipa::path(
    delete,
    path = "/api/admin/year-levels/{year_level_id}",
    tag = "admin",
    params(("year_level_id" = i32, Path, description = "Year level ID")),
    responses(
        (status = 204, description = "Year level deleted"),
        (status = 404, description = "Year level not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_year_level(
    Path(year_level_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    ensure_deleted(
        YearLevel::delete_by_id(year_level_id).exec(&state.db).await?,
        "Year level",
        year_level_id,
    )?;
    invalidate_all_records(&state);
    info!(year_level_id, "Year level deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ===================== Semesters =====================

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSemesterRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SemesterResponse {
    pub id: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<semester::Model> for SemesterResponse {
    fn from(model: semester::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            start_date: model.start_date,
            end_date: model.end_date,
        }
    }
}

/// Create a semester
#[utoipa::path(
    post,
    path = "/api/admin/semesters",
    tag = "admin",
    request_body = CreateSemesterRequest,
    responses(
        (status = 201, description = "Semester created", body = ApiResponse<SemesterResponse>),
        (status = 400, description = "End date before start date", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_semester(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSemesterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SemesterResponse>>), ApiError> {
    if request.end_date < request.start_date {
        return Err(ApiError::Validation(
            "Semester end date must not be before its start date".to_string(),
        ));
    }

    let model = semester::ActiveModel {
        name: Set(request.name),
        start_date: Set(request.start_date),
        end_date: Set(request.end_date),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(semester_id = model.id, "Semester created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            SemesterResponse::from(model),
            "Semester created successfully",
        )),
    ))
}

/// Get all semesters
#[utoipa::path(
    get,
    path = "/api/admin/semesters",
    tag = "admin",
    responses(
        (status = 200, description = "Semesters retrieved", body = ApiResponse<Vec<SemesterResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_semesters(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SemesterResponse>>>, ApiError> {
    let semesters = Semester::find()
        .order_by_asc(semester::Column::StartDate)
        .all(&state.db)
        .await?
        .into_iter()
        .map(SemesterResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(semesters, "Semesters retrieved successfully")))
}

/// Delete a semester
#[utoipa::path(
    delete,
    path = "/api/admin/semesters/{semester_id}",
    tag = "admin",
    params(("semester_id" = i32, Path, description = "Semester ID")),
    responses(
        (status = 204, description = "Semester deleted"),
        (status = 404, description = "Semester not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_semester(
    Path(semester_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    ensure_deleted(
        Semester::delete_by_id(semester_id).exec(&state.db).await?,
        "Semester",
        semester_id,
    )?;
    invalidate_all_records(&state);
    info!(semester_id, "Semester deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ===================== Subjects =====================

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    pub semester_id: Option<i32>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    #[serde(default)]
    pub teacher_ids: Vec<i32>,
    #[serde(default)]
    pub section_ids: Vec<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub semester_id: Option<i32>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    pub teacher_ids: Vec<i32>,
    pub section_ids: Vec<i32>,
}

/// Create a subject with its teachers and sections
#[utoipa::path(
    post,
    path = "/api/admin/subjects",
    tag = "admin",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = ApiResponse<SubjectResponse>),
        (status = 400, description = "Invalid request or unknown reference", body = ErrorResponse),
        (status = 409, description = "Name or code already used", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_subject(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubjectResponse>>), ApiError> {
    let txn = state.db.begin().await?;
    ensure_teachers(&txn, &request.teacher_ids).await?;

    let model = subject::ActiveModel {
        name: Set(request.name),
        code: Set(request.code),
        semester_id: Set(request.semester_id),
        strand_id: Set(request.strand_id),
        year_level_id: Set(request.year_level_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for teacher_id in &request.teacher_ids {
        subject_teacher::ActiveModel {
            subject_id: Set(model.id),
            teacher_id: Set(*teacher_id),
        }
        .insert(&txn)
        .await?;
    }
    for section_id in &request.section_ids {
        subject_section::ActiveModel {
            subject_id: Set(model.id),
            section_id: Set(*section_id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    invalidate_all_records(&state);

    info!(subject_id = model.id, code = %model.code, "Subject created");
    let response = SubjectResponse {
        id: model.id,
        name: model.name,
        code: model.code,
        semester_id: model.semester_id,
        strand_id: model.strand_id,
        year_level_id: model.year_level_id,
        teacher_ids: request.teacher_ids,
        section_ids: request.section_ids,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "Subject created successfully")),
    ))
}

/// Get all subjects
#[utoipa::path(
    get,
    path = "/api/admin/subjects",
    tag = "admin",
    responses(
        (status = 200, description = "Subjects retrieved", body = ApiResponse<Vec<SubjectResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_subjects(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SubjectResponse>>>, ApiError> {
    let subjects = Subject::find()
        .order_by_asc(subject::Column::Id)
        .all(&state.db)
        .await?;
    let teachers = SubjectTeacher::find().all(&state.db).await?;
    let sections = SubjectSection::find().all(&state.db).await?;

    let subjects: Vec<SubjectResponse> = subjects
        .into_iter()
        .map(|model| SubjectResponse {
            teacher_ids: teachers
                .iter()
                .filter(|row| row.subject_id == model.id)
                .map(|row| row.teacher_id)
                .collect(),
            section_ids: sections
                .iter()
                .filter(|row| row.subject_id == model.id)
                .map(|row| row.section_id)
                .collect(),
            id: model.id,
            name: model.name,
            code: model.code,
            semester_id: model.semester_id,
            strand_id: model.strand_id,
            year_level_id: model.year_level_id,
        })
        .collect();

    debug!("Retrieved {} subjects", subjects.len());
    Ok(Json(ApiResponse::ok(subjects, "Subjects retrieved successfully")))
}

/// Delete a subject
///
/// Grades already recorded for the subject stay in the students' grade books
/// and are rendered as "Unknown Subject".
#[utoipa::path(
    delete,
    path = "/api/admin/subjects/{subject_id}",
    tag = "admin",
    params(("subject_id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_subject(
    Path(subject_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    ensure_deleted(
        Subject::delete_by_id(subject_id).exec(&state.db).await?,
        "Subject",
        subject_id,
    )?;
    invalidate_all_records(&state);
    info!(subject_id, "Subject deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ===================== Sections =====================

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    /// Homeroom adviser; a teacher advises at most one section
    pub advisory_teacher_id: Option<i32>,
    #[serde(default)]
    pub teacher_ids: Vec<i32>,
    #[serde(default)]
    pub student_ids: Vec<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionResponse {
    pub id: i32,
    pub name: String,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    pub advisory_teacher_id: Option<i32>,
    pub teacher_ids: Vec<i32>,
    pub student_ids: Vec<i32>,
}

/// Create a section with its teachers, adviser and students
#[utoipa::path(
    post,
    path = "/api/admin/sections",
    tag = "admin",
    request_body = CreateSectionRequest,
    responses(
        (status = 201, description = "Section created", body = ApiResponse<SectionResponse>),
        (status = 400, description = "Invalid request or unknown reference", body = ErrorResponse),
        (status = 409, description = "Adviser already advises a section", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_section(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SectionResponse>>), ApiError> {
    let txn = state.db.begin().await?;
    ensure_teachers(&txn, &request.teacher_ids).await?;

    if let Some(adviser_id) = request.advisory_teacher_id {
        ensure_teachers(&txn, &[adviser_id]).await?;
        let advised = Section::find()
            .filter(section::Column::AdvisoryTeacherId.eq(adviser_id))
            .one(&txn)
            .await?;
        if let Some(existing) = advised {
            warn!(adviser_id, section_id = existing.id, "Teacher already advises a section");
            return Err(ApiError::Conflict(format!(
                "Teacher {} already advises section '{}'",
                adviser_id, existing.name
            )));
        }
    }

    let model = section::ActiveModel {
        name: Set(request.name),
        strand_id: Set(request.strand_id),
        year_level_id: Set(request.year_level_id),
        advisory_teacher_id: Set(request.advisory_teacher_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for teacher_id in &request.teacher_ids {
        section_teacher::ActiveModel {
            section_id: Set(model.id),
            teacher_id: Set(*teacher_id),
        }
        .insert(&txn)
        .await?;
    }
    for student_id in &request.student_ids {
        student_section::ActiveModel {
            student_id: Set(*student_id),
            section_id: Set(model.id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    invalidate_all_records(&state);

    info!(section_id = model.id, "Section created");
    let response = SectionResponse {
        id: model.id,
        name: model.name,
        strand_id: model.strand_id,
        year_level_id: model.year_level_id,
        advisory_teacher_id: model.advisory_teacher_id,
        teacher_ids: request.teacher_ids,
        student_ids: request.student_ids,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "Section created successfully")),
    ))
}

/// Get all sections
#[utoipa::path(
    get,
    path = "/api/admin/sections",
    tag = "admin",
    responses(
        (status = 200, description = "Sections retrieved", body = ApiResponse<Vec<SectionResponse>>)
    )
)]
#[instrument(skip(state))]
pub async fn list_sections(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SectionResponse>>>, ApiError> {
    let sections = Section::find()
        .order_by_asc(section::Column::Id)
        .all(&state.db)
        .await?;
    let teachers = SectionTeacher::find().all(&state.db).await?;
    let students = student_section::Entity::find().all(&state.db).await?;

    let sections: Vec<SectionResponse> = sections
        .into_iter()
        .map(|model| SectionResponse {
            teacher_ids: teachers
                .iter()
                .filter(|row| row.section_id == model.id)
                .map(|row| row.teacher_id)
                .collect(),
            student_ids: students
                .iter()
                .filter(|row| row.section_id == model.id)
                .map(|row| row.student_id)
                .collect(),
            id: model.id,
            name: model.name,
            strand_id: model.strand_id,
            year_level_id: model.year_level_id,
            advisory_teacher_id: model.advisory_teacher_id,
        })
        .collect();

    Ok(Json(ApiResponse::ok(sections, "Sections retrieved successfully")))
}

/// Delete a section
#[utoipa::path(
    delete,
    path = "/api/admin/sections/{section_id}",
    tag = "admin",
    params(("section_id" = i32, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 404, description = "Section not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_section(
    Path(section_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    ensure_deleted(
        Section::delete_by_id(section_id).exec(&state.db).await?,
        "Section",
        section_id,
    )?;
    invalidate_all_records(&state);
    info!(section_id, "Section deleted");
    Ok(StatusCode::NO_CONTENT)
}
