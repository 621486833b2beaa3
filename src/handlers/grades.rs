use axum::{
    Extension,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use common::AcademicRecord;
use compute::{grading, record};
use model::entities::{prelude::Student, student, user::UserRole};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::form137::render_form137;
use crate::schemas::{AppState, CachedData};

/// Cache key of a student's record at its current revision and record epoch.
///
/// Grade and profile writes bump the revision and reference data writes bump
/// the epoch. An insert racing a write lands under a key no later read asks
/// for, and superseded entries age out of the cache.
async fn record_cache_key(state: &AppState, student_id: i32) -> Result<String, ApiError> {
    let revision = Student::find_by_id(student_id)
        .select_only()
        .column(student::Column::Revision)
        .into_tuple::<i32>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Student with id {} not found", student_id)))?;
    let epoch = state.record_epoch.load(Ordering::Acquire);
    Ok(format!("record_{}_{}_{}", student_id, revision, epoch))
}

/// Formatted academic record, served from the cache when present.
pub(crate) async fn cached_academic_record(
    state: &AppState,
    student_id: i32,
) -> Result<AcademicRecord, ApiError> {
    let key = record_cache_key(state, student_id).await?;
    if let Some(CachedData::AcademicRecord(cached)) = state.cache.get(&key).await {
        trace!(student_id, "Academic record cache hit");
        return Ok(cached);
    }

    let formatted = record::format_student_academic_record(&state.db, student_id).await?;
    state
        .cache
        .insert(key, CachedData::AcademicRecord(formatted.clone()))
        .await;
    debug!(student_id, "Academic record cached");
    Ok(formatted)
}

/// Drop every cached record after reference data changed.
pub(crate) fn invalidate_all_records(state: &AppState) {
    state.record_epoch.fetch_add(1, Ordering::AcqRel);
    state.cache.invalidate_all();
}

/// Student row owned by the given user.
pub(crate) async fn student_of_user(
    state: &AppState,
    user_id: i32,
) -> Result<student::Model, ApiError> {
    Student::find()
        .filter(student::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("No student profile for this account".to_string()))
}

/// Download the Form 137 of a student as PDF
///
/// Students may only download their own record.
#[utoipa::path(
    get,
    path = "/api/grades/form137/{student_id}",
    tag = "grades",
    params(("student_id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Form 137 PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 403, description = "Not the caller's own record", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "PDF generation failed", body = String, content_type = "text/plain")
    )
)]
#[instrument(skip(state, caller), fields(user_id = caller.id))]
pub async fn download_form137(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Response, ApiError> {
    if caller.role == UserRole::Student {
        let own = student_of_user(&state, caller.id).await?;
        if own.id != student_id {
            warn!(student_id, "Student requested another student's Form 137");
            return Err(ApiError::Forbidden(
                "Students may only download their own Form 137".to_string(),
            ));
        }
    }

    let academic_record = cached_academic_record(&state, student_id).await?;

    match render_form137(&academic_record) {
        Ok(bytes) => {
            info!(student_id, size = bytes.len(), "Form 137 generated");
            let disposition = format!("attachment; filename=\"form137_{}.pdf\"", student_id);
            Ok((
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response())
        }
        Err(e) => {
            error!(student_id, "Failed to generate Form 137: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                "Failed to generate PDF",
            )
                .into_response())
        }
    }
}

/// Delete a legacy standalone grade record
#[utoipa::path(
    delete,
    path = "/api/grades/{grade_record_id}",
    tag = "grades",
    params(("grade_record_id" = i32, Path, description = "Grade record ID")),
    responses(
        (status = 204, description = "Grade record deleted"),
        (status = 404, description = "Grade record not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_grade_record(
    Path(grade_record_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    grading::remove_grade_record(&state.db, grade_record_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{seed_school, setup_test_app_state};
    use model::entities::section;
    use model::gradebook::ComponentKind;
    use sea_orm::{ActiveModelTrait, Set};

    #[tokio::test]
    async fn test_record_cached_before_grade_write_is_not_served() {
        let state = setup_test_app_state().await;
        let school = seed_school(&state.db).await;
        let student_id = school.student.id;

        // A reader formats the record, a grade write commits, then the
        // reader's insert lands.
        let key = record_cache_key(&state, student_id).await.unwrap();
        let stale = record::format_student_academic_record(&state.db, student_id)
            .await
            .unwrap();
        grading::upsert_component_score(
            &state.db,
            student_id,
            school.subject_id,
            school.semester_id,
            ComponentKind::Midterm,
            88.0,
        )
        .await
        .unwrap();
        state.cache.insert(key, CachedData::AcademicRecord(stale)).await;

        let fresh = cached_academic_record(&state, student_id).await.unwrap();
        let block = fresh.semester("1st Semester").expect("semester block");
        assert_eq!(block.subjects[0].midterm, Some(88.0));
    }

    #[tokio::test]
    async fn test_record_cached_before_reference_write_is_not_served() {
        let state = setup_test_app_state().await;
        let school = seed_school(&state.db).await;
        let student_id = school.student.id;

        let key = record_cache_key(&state, student_id).await.unwrap();
        let stale = record::format_student_academic_record(&state.db, student_id)
            .await
            .unwrap();
        section::ActiveModel {
            id: Set(school.section_id),
            name: Set("Curie".to_string()),
            ..Default::default()
        }
        .update(&state.db)
        .await
        .unwrap();
        invalidate_all_records(&state);
        state.cache.insert(key, CachedData::AcademicRecord(stale)).await;

        let fresh = cached_academic_record(&state, student_id).await.unwrap();
        assert_eq!(fresh.demographics.section, "Curie");
    }

    #[tokio::test]
    async fn test_record_cache_key_of_unknown_student_is_not_found() {
        let state = setup_test_app_state().await;

        let result = cached_academic_record(&state, 9999).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
