//! Academic filtering engine: which students a teacher sees and which of
//! them belong to the teacher's advisory class.

use std::collections::HashMap;

use common::{NamedRef, SectionRoster, StudentSummary};
use model::entities::prelude::{
    Section, SectionTeacher, Strand, Student, StudentSection, StudentSubject, Subject, User,
    YearLevel,
};
use model::entities::{section, section_teacher, student, student_section, student_subject, user};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument};

use crate::error::{ComputeError, Result};

/// A student together with its account and enrolments.
#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub student: student::Model,
    pub user: Option<user::Model>,
    pub section_ids: Vec<i32>,
    pub subject_ids: Vec<i32>,
}

/// What a student must match to appear on a subject roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectScope {
    pub subject_id: i32,
    pub semester_id: i32,
    /// `None` places no constraint on the student's strand.
    pub strand_id: Option<i32>,
    /// `None` places no constraint on the student's year level.
    pub year_level_id: Option<i32>,
}

/// True when the profile belongs on the roster of the scoped subject.
pub fn matches_subject_scope(profile: &StudentProfile, scope: &SubjectScope) -> bool {
    let is_student = profile
        .user
        .as_ref()
        .is_some_and(|user| user.role == user::UserRole::Student);

    is_student
        && profile.subject_ids.contains(&scope.subject_id)
        && profile.student.semester_id == Some(scope.semester_id)
        && scope
            .strand_id
            .is_none_or(|strand_id| profile.student.strand_id == Some(strand_id))
        && scope
            .year_level_id
            .is_none_or(|year_level_id| profile.student.year_level_id == Some(year_level_id))
}

/// Subject rosters: the student is enrolled in the teacher's advisory section.
pub fn is_student_in_advisory_section(student_section_ids: &[i32], advisory_section_id: i32) -> bool {
    student_section_ids.contains(&advisory_section_id)
}

/// Section rosters: the teacher is the section's adviser.
pub fn is_advisory_section_of(section: &section::Model, teacher_id: i32) -> bool {
    section.advisory_teacher_id == Some(teacher_id)
}

/// Display names of the reference entities a summary mentions.
#[derive(Debug, Default)]
struct NameLookup {
    sections: HashMap<i32, String>,
    strands: HashMap<i32, String>,
    year_levels: HashMap<i32, String>,
}

impl NameLookup {
    async fn load(db: &DatabaseConnection) -> Result<Self> {
        let sections = Section::find()
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let strands = Strand::find()
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let year_levels = YearLevel::find()
            .all(db)
            .await?
            .into_iter()
            .map(|y| (y.id, y.name))
            .collect();

        Ok(Self {
            sections,
            strands,
            year_levels,
        })
    }

    fn named(map: &HashMap<i32, String>, id: i32) -> Option<NamedRef> {
        map.get(&id).map(|name| NamedRef {
            id,
            name: name.clone(),
        })
    }

    fn summarize(&self, profile: &StudentProfile, is_advisory: bool) -> StudentSummary {
        StudentSummary {
            student_id: profile.student.id,
            user_id: profile.student.user_id,
            display_name: profile
                .user
                .as_ref()
                .map(user::Model::display_name)
                .unwrap_or_default(),
            sections: profile
                .section_ids
                .iter()
                .filter_map(|id| Self::named(&self.sections, *id))
                .collect(),
            strand: profile
                .student
                .strand_id
                .and_then(|id| Self::named(&self.strands, id)),
            year_level: profile
                .student
                .year_level_id
                .and_then(|id| Self::named(&self.year_levels, id)),
            is_advisory,
        }
    }
}

/// Attaches accounts and enrolments to the given students, preserving order.
async fn load_profiles(
    db: &DatabaseConnection,
    students: Vec<(student::Model, Option<user::Model>)>,
) -> Result<Vec<StudentProfile>> {
    let ids: Vec<i32> = students.iter().map(|(s, _)| s.id).collect();

    let mut sections_by_student: HashMap<i32, Vec<i32>> = HashMap::new();
    for row in StudentSection::find()
        .filter(student_section::Column::StudentId.is_in(ids.clone()))
        .order_by_asc(student_section::Column::SectionId)
        .all(db)
        .await?
    {
        sections_by_student
            .entry(row.student_id)
            .or_default()
            .push(row.section_id);
    }

    let mut subjects_by_student: HashMap<i32, Vec<i32>> = HashMap::new();
    for row in StudentSubject::find()
        .filter(student_subject::Column::StudentId.is_in(ids))
        .order_by_asc(student_subject::Column::SubjectId)
        .all(db)
        .await?
    {
        subjects_by_student
            .entry(row.student_id)
            .or_default()
            .push(row.subject_id);
    }

    Ok(students
        .into_iter()
        .map(|(student, user)| StudentProfile {
            section_ids: sections_by_student.remove(&student.id).unwrap_or_default(),
            subject_ids: subjects_by_student.remove(&student.id).unwrap_or_default(),
            student,
            user,
        })
        .collect())
}

/// Students of `subject_id` in `semester_id` as seen by `teacher_id`.
///
/// Teachers without an advisory section get an empty roster.
#[instrument(skip(db))]
pub async fn roster_for_subject(
    db: &DatabaseConnection,
    teacher_id: i32,
    subject_id: i32,
    semester_id: i32,
) -> Result<Vec<StudentSummary>> {
    let subject = Subject::find_by_id(subject_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Subject", subject_id))?;

    let Some(advisory) = Section::find()
        .filter(section::Column::AdvisoryTeacherId.eq(teacher_id))
        .order_by_asc(section::Column::Id)
        .one(db)
        .await?
    else {
        debug!(teacher_id, "Teacher has no advisory section");
        return Ok(Vec::new());
    };

    let scope = SubjectScope {
        subject_id,
        semester_id,
        strand_id: subject.strand_id,
        year_level_id: subject.year_level_id,
    };

    let candidates = Student::find()
        .filter(student::Column::SemesterId.eq(semester_id))
        .order_by_asc(student::Column::Id)
        .find_also_related(User)
        .all(db)
        .await?;
    let profiles = load_profiles(db, candidates).await?;
    let names = NameLookup::load(db).await?;

    let roster: Vec<StudentSummary> = profiles
        .iter()
        .filter(|profile| matches_subject_scope(profile, &scope))
        .map(|profile| {
            let is_advisory = is_student_in_advisory_section(&profile.section_ids, advisory.id);
            names.summarize(profile, is_advisory)
        })
        .collect();

    debug!(count = roster.len(), "Subject roster built");
    Ok(roster)
}

/// Every section `teacher_id` is assigned to, with its students.
#[instrument(skip(db))]
pub async fn roster_for_sections(
    db: &DatabaseConnection,
    teacher_id: i32,
) -> Result<Vec<SectionRoster>> {
    let section_ids: Vec<i32> = SectionTeacher::find()
        .filter(section_teacher::Column::TeacherId.eq(teacher_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.section_id)
        .collect();

    let sections = Section::find()
        .filter(section::Column::Id.is_in(section_ids.clone()))
        .order_by_asc(section::Column::Id)
        .all(db)
        .await?;

    let enrolments = StudentSection::find()
        .filter(student_section::Column::SectionId.is_in(section_ids))
        .all(db)
        .await?;
    let student_ids: Vec<i32> = enrolments.iter().map(|row| row.student_id).collect();

    let students = Student::find()
        .filter(student::Column::Id.is_in(student_ids))
        .order_by_asc(student::Column::Id)
        .find_also_related(User)
        .all(db)
        .await?;
    let profiles = load_profiles(db, students).await?;
    let names = NameLookup::load(db).await?;

    let rosters = sections
        .into_iter()
        .map(|section| {
            let is_advisory = is_advisory_section_of(&section, teacher_id);
            let students = profiles
                .iter()
                .filter(|profile| profile.section_ids.contains(&section.id))
                .map(|profile| names.summarize(profile, is_advisory))
                .collect();
            SectionRoster {
                section_id: section.id,
                section_name: section.name,
                is_advisory,
                students,
            }
        })
        .collect();

    Ok(rosters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        enrol_in_section, enrol_in_subject, insert_semester, insert_student, insert_subject,
        insert_user, school,
    };
    use model::entities::section_teacher;
    use sea_orm::{ActiveModelTrait, Set};

    fn profile(role: user::UserRole) -> StudentProfile {
        StudentProfile {
            student: student::Model {
                id: 1,
                user_id: 1,
                lrn: None,
                sex: None,
                birth_date: None,
                address: None,
                contact_number: None,
                guardian_name: None,
                guardian_relationship: None,
                guardian_contact: None,
                birthplace_province: None,
                birthplace_municipality: None,
                birthplace_barangay: None,
                strand_id: Some(10),
                year_level_id: Some(20),
                semester_id: Some(30),
                grades: String::new(),
                revision: 0,
            },
            user: Some(user::Model {
                id: 1,
                username: "s".to_string(),
                password_hash: String::new(),
                role,
                is_profile_complete: true,
                is_active: true,
                first_name: None,
                middle_name: None,
                last_name: None,
                email: None,
            }),
            section_ids: vec![5],
            subject_ids: vec![7],
        }
    }

    fn scope() -> SubjectScope {
        SubjectScope {
            subject_id: 7,
            semester_id: 30,
            strand_id: Some(10),
            year_level_id: Some(20),
        }
    }

    #[test]
    fn test_scope_requires_every_predicate() {
        let base = profile(user::UserRole::Student);
        assert!(matches_subject_scope(&base, &scope()));

        let teacher = profile(user::UserRole::Teacher);
        assert!(!matches_subject_scope(&teacher, &scope()));

        let mut not_enrolled = base.clone();
        not_enrolled.subject_ids.clear();
        assert!(!matches_subject_scope(&not_enrolled, &scope()));

        let mut other_semester = base.clone();
        other_semester.student.semester_id = Some(31);
        assert!(!matches_subject_scope(&other_semester, &scope()));

        let mut other_strand = base.clone();
        other_strand.student.strand_id = None;
        assert!(!matches_subject_scope(&other_strand, &scope()));

        let mut other_year = base.clone();
        other_year.student.year_level_id = Some(21);
        assert!(!matches_subject_scope(&other_year, &scope()));
    }

    #[test]
    fn test_unset_subject_constraints_match_anything() {
        let mut student = profile(user::UserRole::Student);
        student.student.strand_id = None;
        student.student.year_level_id = Some(99);

        let open = SubjectScope {
            strand_id: None,
            year_level_id: None,
            ..scope()
        };
        assert!(matches_subject_scope(&student, &open));
    }

    #[test]
    fn test_advisory_predicates() {
        assert!(is_student_in_advisory_section(&[3, 5], 5));
        assert!(!is_student_in_advisory_section(&[3], 5));
        assert!(!is_student_in_advisory_section(&[], 5));

        let section = section::Model {
            id: 5,
            name: "Einstein".to_string(),
            strand_id: None,
            year_level_id: None,
            advisory_teacher_id: Some(42),
        };
        assert!(is_advisory_section_of(&section, 42));
        assert!(!is_advisory_section_of(&section, 43));
    }

    #[tokio::test]
    async fn test_subject_roster_filters_and_flags() {
        let school = school().await;
        let db = &school.db;

        // Enrolled in the subject but in another section.
        let other_section = section::ActiveModel {
            name: Set("Curie".to_string()),
            strand_id: Set(Some(school.stem.id)),
            year_level_id: Set(Some(school.grade_11.id)),
            advisory_teacher_id: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        let peer_user = insert_user(db, "peer", user::UserRole::Student).await;
        let peer = insert_student(
            db,
            peer_user.id,
            Some(school.stem.id),
            Some(school.grade_11.id),
            Some(school.first_sem.id),
        )
        .await;
        enrol_in_section(db, peer.id, other_section.id).await;
        enrol_in_subject(db, peer.id, school.math.id).await;

        // Right subject, wrong semester.
        let second_sem = insert_semester(db, "2nd Semester").await;
        let late_user = insert_user(db, "late", user::UserRole::Student).await;
        let late = insert_student(
            db,
            late_user.id,
            Some(school.stem.id),
            Some(school.grade_11.id),
            Some(second_sem.id),
        )
        .await;
        enrol_in_subject(db, late.id, school.math.id).await;

        // Right semester, not enrolled in the subject.
        let idle_user = insert_user(db, "idle", user::UserRole::Student).await;
        insert_student(
            db,
            idle_user.id,
            Some(school.stem.id),
            Some(school.grade_11.id),
            Some(school.first_sem.id),
        )
        .await;

        let roster = roster_for_subject(db, school.teacher.id, school.math.id, school.first_sem.id)
            .await
            .unwrap();

        let ids: Vec<i32> = roster.iter().map(|s| s.student_id).collect();
        assert_eq!(ids, vec![school.student.id, peer.id]);

        assert!(roster[0].is_advisory);
        assert_eq!(roster[0].sections[0].name, "Einstein");
        assert_eq!(roster[0].strand.as_ref().map(|s| s.name.as_str()), Some("STEM"));
        assert_eq!(roster[0].display_name, "STUDENT Tester");
        assert!(!roster[1].is_advisory);
    }

    #[tokio::test]
    async fn test_subject_roster_without_advisory_section_is_empty() {
        let school = school().await;
        let db = &school.db;

        let other_teacher = insert_user(db, "other", user::UserRole::Teacher).await;
        let roster = roster_for_subject(db, other_teacher.id, school.math.id, school.first_sem.id)
            .await
            .unwrap();
        assert!(roster.is_empty());
    }

    #[tokio::test]
    async fn test_subject_roster_unknown_subject() {
        let school = school().await;
        let result = roster_for_subject(&school.db, school.teacher.id, 9999, school.first_sem.id).await;
        assert!(matches!(result, Err(ComputeError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_subject_includes_every_strand() {
        let school = school().await;
        let db = &school.db;

        let pe = insert_subject(db, "PE101", school.first_sem.id, None, None).await;
        enrol_in_subject(db, school.student.id, pe.id).await;

        let drifter_user = insert_user(db, "drifter", user::UserRole::Student).await;
        let drifter = insert_student(db, drifter_user.id, None, None, Some(school.first_sem.id)).await;
        enrol_in_subject(db, drifter.id, pe.id).await;

        let roster = roster_for_subject(db, school.teacher.id, pe.id, school.first_sem.id)
            .await
            .unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster[1].strand.is_none());
    }

    #[tokio::test]
    async fn test_section_rosters_flag_advisory_sections() {
        let school = school().await;
        let db = &school.db;

        let other_section = section::ActiveModel {
            name: Set("Curie".to_string()),
            strand_id: Set(Some(school.stem.id)),
            year_level_id: Set(Some(school.grade_11.id)),
            advisory_teacher_id: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        for section_id in [school.section.id, other_section.id] {
            section_teacher::ActiveModel {
                section_id: Set(section_id),
                teacher_id: Set(school.teacher.id),
            }
            .insert(db)
            .await
            .unwrap();
        }

        let rosters = roster_for_sections(db, school.teacher.id).await.unwrap();
        assert_eq!(rosters.len(), 2);

        assert_eq!(rosters[0].section_name, "Einstein");
        assert!(rosters[0].is_advisory);
        assert_eq!(rosters[0].students.len(), 1);
        assert!(rosters[0].students[0].is_advisory);

        assert_eq!(rosters[1].section_name, "Curie");
        assert!(!rosters[1].is_advisory);
        assert!(rosters[1].students.is_empty());
    }
}
