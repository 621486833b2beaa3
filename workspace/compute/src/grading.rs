//! Grade computation engine.
//!
//! A subject grade is made of a midterm and a finals score. Once both are
//! present the final rating is their mean and the action follows from the
//! passing threshold; while either is missing neither derived value exists.

use common::SubjectGradeDto;
use model::entities::prelude::{GradeRecord, Semester, Student, Subject};
use model::entities::student;
use model::gradebook::{ComponentKind, GradeAction, GradeBook, SubjectGrade};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, info, instrument, warn};

use crate::error::{ComputeError, Result};

/// Lowest final rating that still passes.
pub const PASSING_RATING: f64 = 75.0;

/// Rejects scores outside `0..=100`, NaN included.
pub fn validate_score(value: f64) -> Result<()> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ComputeError::Validation(format!(
            "Grade value must be between 0 and 100, got {}",
            value
        )))
    }
}

pub fn action_for(final_rating: f64) -> GradeAction {
    if final_rating >= PASSING_RATING {
        GradeAction::Passed
    } else {
        GradeAction::Failed
    }
}

/// Brings `final_rating` and `action` in line with the two components.
pub fn recompute(grade: &mut SubjectGrade) {
    match (grade.midterm, grade.finals) {
        (Some(midterm), Some(finals)) => {
            let rating = (midterm + finals) / 2.0;
            grade.final_rating = Some(rating);
            grade.action = Some(action_for(rating));
        }
        _ => {
            grade.final_rating = None;
            grade.action = None;
        }
    }
}

/// Transport form of a subject grade.
pub fn grade_dto(grade: &SubjectGrade) -> SubjectGradeDto {
    SubjectGradeDto {
        midterm: grade.midterm,
        finals: grade.finals,
        final_rating: grade.final_rating,
        action: grade.action.map(|action| action.as_str().to_string()),
    }
}

/// Sets (`Some`) or clears (`None`) one component of a subject grade and
/// recomputes the derived fields.
///
/// Setting creates the semester and subject nodes when they are missing.
/// Clearing a pair that has no entry leaves the book untouched and returns
/// an empty grade. The book is not modified when validation fails.
pub fn apply_component_score(
    book: &mut GradeBook,
    semester_id: i32,
    subject_id: i32,
    kind: ComponentKind,
    value: Option<f64>,
) -> Result<SubjectGrade> {
    match value {
        Some(score) => validate_score(score)?,
        None if book.get(semester_id, subject_id).is_none() => {
            return Ok(SubjectGrade::default());
        }
        None => {}
    }

    let grade = book.entry(semester_id, subject_id);
    grade.set_component(kind, value);
    recompute(grade);
    Ok(*grade)
}

/// Records a component score for a student and persists the grade book.
#[instrument(skip(db))]
pub async fn upsert_component_score(
    db: &DatabaseConnection,
    student_id: i32,
    subject_id: i32,
    semester_id: i32,
    kind: ComponentKind,
    value: f64,
) -> Result<SubjectGrade> {
    validate_score(value)?;
    write_component(db, student_id, subject_id, semester_id, kind, Some(value)).await
}

/// Unsets a component score, which also clears the final rating and action.
#[instrument(skip(db))]
pub async fn clear_component_score(
    db: &DatabaseConnection,
    student_id: i32,
    subject_id: i32,
    semester_id: i32,
    kind: ComponentKind,
) -> Result<SubjectGrade> {
    write_component(db, student_id, subject_id, semester_id, kind, None).await
}

async fn write_component(
    db: &DatabaseConnection,
    student_id: i32,
    subject_id: i32,
    semester_id: i32,
    kind: ComponentKind,
    value: Option<f64>,
) -> Result<SubjectGrade> {
    let student = Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Student", student_id))?;

    if Subject::find_by_id(subject_id).one(db).await?.is_none() {
        return Err(ComputeError::not_found("Subject", subject_id));
    }
    if Semester::find_by_id(semester_id).one(db).await?.is_none() {
        return Err(ComputeError::not_found("Semester", semester_id));
    }

    let mut book = student.grade_book()?;
    let before = book.clone();
    let grade = apply_component_score(&mut book, semester_id, subject_id, kind, value)?;

    if book == before {
        debug!(student_id, "Grade book unchanged, skipping write");
        return Ok(grade);
    }

    save_grade_book(db, &student, &book).await?;
    info!(
        student_id,
        subject_id,
        semester_id,
        component = %kind,
        final_rating = ?grade.final_rating,
        "Grade updated"
    );
    Ok(grade)
}

/// Writes `book` back to the student row only if nobody else has written
/// since `student` was read.
pub async fn save_grade_book(
    db: &DatabaseConnection,
    student: &student::Model,
    book: &GradeBook,
) -> Result<()> {
    let result = Student::update_many()
        .col_expr(student::Column::Grades, Expr::value(book.to_json()?))
        .col_expr(student::Column::Revision, Expr::value(student.revision + 1))
        .filter(student::Column::Id.eq(student.id))
        .filter(student::Column::Revision.eq(student.revision))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(
            student_id = student.id,
            revision = student.revision,
            "Stale grade book revision"
        );
        return Err(ComputeError::Conflict(format!(
            "Grades of student {} were modified concurrently, retry the request",
            student.id
        )));
    }
    Ok(())
}

/// Deletes a legacy standalone grade row.
#[instrument(skip(db))]
pub async fn remove_grade_record(db: &DatabaseConnection, grade_record_id: i32) -> Result<()> {
    let result = GradeRecord::delete_by_id(grade_record_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ComputeError::not_found("Grade record", grade_record_id));
    }
    info!(grade_record_id, "Legacy grade record removed");
    Ok(())
}
