//! Record formatting layer: flattens a student's profile and grade book into
//! an [`AcademicRecord`].
//!
//! References stored in the student row and inside the grade book may point
//! at entities that were deleted since. They are carried as [`WeakRef`]s and
//! rendered with placeholders instead of failing.

use std::collections::{HashMap, HashSet};

use common::{
    AcademicRecord, Birthplace, Demographics, GuardianInfo, NOT_AVAILABLE, SemesterGradeBlock,
    SubjectGradeRow, UNKNOWN_SEMESTER, UNKNOWN_SUBJECT,
};
use model::entities::prelude::{Section, Semester, Strand, Student, Subject, User, YearLevel};
use model::entities::{section, semester, strand, student, subject, user, year_level};
use model::gradebook::GradeBook;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument};

use crate::error::{ComputeError, Result};

/// An id that may or may not still resolve to a record.
#[derive(Debug, Clone, PartialEq)]
pub struct WeakRef<T> {
    pub id: i32,
    pub resolved: Option<T>,
}

impl<T: Clone> WeakRef<T> {
    pub fn new(id: i32, resolved: Option<T>) -> Self {
        Self { id, resolved }
    }

    pub fn lookup(id: i32, table: &HashMap<i32, T>) -> Self {
        Self::new(id, table.get(&id).cloned())
    }

    pub fn is_dangling(&self) -> bool {
        self.resolved.is_none()
    }

    /// Applies `f` to the resolved value, or returns `fallback`.
    pub fn render(&self, fallback: &str, f: impl FnOnce(&T) -> String) -> String {
        self.resolved
            .as_ref()
            .map(f)
            .unwrap_or_else(|| fallback.to_string())
    }
}

fn render_opt<T: Clone>(reference: &Option<WeakRef<T>>, f: impl FnOnce(&T) -> String) -> String {
    match reference {
        Some(weak) => weak.render(NOT_AVAILABLE, f),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Everything the formatter reads, already loaded.
#[derive(Debug, Clone)]
pub struct RecordSources {
    pub student: student::Model,
    pub user: Option<user::Model>,
    pub section: Option<WeakRef<section::Model>>,
    pub strand: Option<WeakRef<strand::Model>>,
    pub year_level: Option<WeakRef<year_level::Model>>,
    pub grade_book: GradeBook,
    pub semesters: HashMap<i32, semester::Model>,
    pub subjects: HashMap<i32, subject::Model>,
}

/// Groups the grade book by semester name in first-seen order. Distinct
/// semester ids sharing a name end up in one block.
pub fn format_grades(
    book: &GradeBook,
    semesters: &HashMap<i32, semester::Model>,
    subjects: &HashMap<i32, subject::Model>,
) -> Vec<SemesterGradeBlock> {
    let mut blocks: Vec<SemesterGradeBlock> = Vec::new();

    for (semester_id, grades) in book.semesters() {
        let semester_name =
            WeakRef::lookup(semester_id, semesters).render(UNKNOWN_SEMESTER, |s| s.name.clone());

        let rows = grades.iter().map(|(subject_id, grade)| {
            let subject = WeakRef::lookup(*subject_id, subjects);
            SubjectGradeRow {
                subject_id: *subject_id,
                name: subject.render(UNKNOWN_SUBJECT, |s| s.name.clone()),
                code: subject.render(NOT_AVAILABLE, |s| s.code.clone()),
                midterm: grade.midterm,
                finals: grade.finals,
                final_rating: grade.final_rating,
                action: grade.action.map(|a| a.to_string()),
            }
        });

        match blocks.iter_mut().find(|b| b.semester_name == semester_name) {
            Some(block) => block.subjects.extend(rows),
            None => blocks.push(SemesterGradeBlock {
                semester_name,
                subjects: rows.collect(),
            }),
        }
    }

    blocks
}

/// Builds the record from loaded sources. Never fails on missing references.
pub fn assemble_academic_record(sources: &RecordSources) -> AcademicRecord {
    let student = &sources.student;
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let account = sources.user.as_ref();

    let demographics = Demographics {
        lrn: student
            .lrn
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        first_name: account.and_then(|u| u.first_name.clone()).unwrap_or_default(),
        middle_name: account.and_then(|u| u.middle_name.clone()).unwrap_or_default(),
        last_name: account.and_then(|u| u.last_name.clone()).unwrap_or_default(),
        full_name: account
            .map(user::Model::display_name)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        sex: text(&student.sex),
        birth_date: student.birth_date,
        address: text(&student.address),
        contact_number: text(&student.contact_number),
        section: render_opt(&sources.section, |s| s.name.clone()),
        strand: render_opt(&sources.strand, |s| s.name.clone()),
        year_level: render_opt(&sources.year_level, |y| y.name.clone()),
    };

    AcademicRecord {
        student_id: student.id,
        demographics,
        guardian: GuardianInfo {
            name: text(&student.guardian_name),
            relationship: text(&student.guardian_relationship),
            contact: text(&student.guardian_contact),
        },
        birthplace: Birthplace {
            province: text(&student.birthplace_province),
            municipality: text(&student.birthplace_municipality),
            barangay: text(&student.birthplace_barangay),
        },
        grades: format_grades(&sources.grade_book, &sources.semesters, &sources.subjects),
    }
}

/// Loads and formats the academic record of one student.
#[instrument(skip(db))]
pub async fn format_student_academic_record(
    db: &DatabaseConnection,
    student_id: i32,
) -> Result<AcademicRecord> {
    let student = Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Student", student_id))?;

    let user = User::find_by_id(student.user_id).one(db).await?;

    // First enrolled section by id.
    let section = student
        .find_related(Section)
        .order_by_asc(section::Column::Id)
        .one(db)
        .await?
        .map(|s| WeakRef::new(s.id, Some(s)));

    let strand = match student.strand_id {
        Some(id) => Some(WeakRef::new(id, Strand::find_by_id(id).one(db).await?)),
        None => None,
    };
    let year_level = match student.year_level_id {
        Some(id) => Some(WeakRef::new(id, YearLevel::find_by_id(id).one(db).await?)),
        None => None,
    };

    let grade_book = student.grade_book()?;
    let mut semester_ids = HashSet::new();
    let mut subject_ids = HashSet::new();
    for (semester_id, grades) in grade_book.semesters() {
        semester_ids.insert(semester_id);
        subject_ids.extend(grades.keys().copied());
    }

    let semesters = Semester::find()
        .filter(semester::Column::Id.is_in(semester_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let subjects = Subject::find()
        .filter(subject::Column::Id.is_in(subject_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let sources = RecordSources {
        student,
        user,
        section,
        strand,
        year_level,
        grade_book,
        semesters,
        subjects,
    };
    let record = assemble_academic_record(&sources);
    debug!(
        semesters = record.grades.len(),
        "Academic record formatted"
    );
    Ok(record)
}
