//! Shared fixtures for engine tests.

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use model::entities::{
    section, semester, strand, student, student_section, student_subject, subject, user,
    year_level,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub async fn setup_db() -> DatabaseConnection {
    init_tracing();
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

pub async fn insert_user(db: &DatabaseConnection, username: &str, role: user::UserRole) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set(role),
        is_profile_complete: Set(true),
        is_active: Set(true),
        first_name: Set(Some(username.to_uppercase())),
        middle_name: Set(None),
        last_name: Set(Some("Tester".to_string())),
        email: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

pub async fn insert_semester(db: &DatabaseConnection, name: &str) -> semester::Model {
    semester::ActiveModel {
        name: Set(name.to_string()),
        start_date: Set(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()),
        end_date: Set(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert semester")
}

pub async fn insert_subject(
    db: &DatabaseConnection,
    code: &str,
    semester_id: i32,
    strand_id: Option<i32>,
    year_level_id: Option<i32>,
) -> subject::Model {
    subject::ActiveModel {
        name: Set(format!("Subject {}", code)),
        code: Set(code.to_string()),
        semester_id: Set(Some(semester_id)),
        strand_id: Set(strand_id),
        year_level_id: Set(year_level_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert subject")
}

pub async fn insert_student(
    db: &DatabaseConnection,
    user_id: i32,
    strand_id: Option<i32>,
    year_level_id: Option<i32>,
    semester_id: Option<i32>,
) -> student::Model {
    student::ActiveModel {
        user_id: Set(user_id),
        lrn: Set(Some(format!("1000000000{:02}", user_id))),
        strand_id: Set(strand_id),
        year_level_id: Set(year_level_id),
        semester_id: Set(semester_id),
        grades: Set("[]".to_string()),
        revision: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert student")
}

pub async fn enrol_in_section(db: &DatabaseConnection, student_id: i32, section_id: i32) {
    student_section::ActiveModel {
        student_id: Set(student_id),
        section_id: Set(section_id),
    }
    .insert(db)
    .await
    .expect("Failed to enrol student in section");
}

pub async fn enrol_in_subject(db: &DatabaseConnection, student_id: i32, subject_id: i32) {
    student_subject::ActiveModel {
        student_id: Set(student_id),
        subject_id: Set(subject_id),
    }
    .insert(db)
    .await
    .expect("Failed to enrol student in subject");
}

/// A STEM Grade 11 class in its first semester: one advising teacher, one
/// section, one subject and one enrolled student.
pub struct School {
    pub db: DatabaseConnection,
    pub stem: strand::Model,
    pub grade_11: year_level::Model,
    pub first_sem: semester::Model,
    pub teacher: user::Model,
    pub section: section::Model,
    pub math: subject::Model,
    pub student_user: user::Model,
    pub student: student::Model,
}

pub async fn school() -> School {
    let db = setup_db().await;

    let stem = strand::ActiveModel {
        name: Set("STEM".to_string()),
        description: Set(None),
        ..Default::default()
    }
    .insert(&db)
    .await
    .expect("Failed to insert strand");

    let grade_11 = year_level::ActiveModel {
        name: Set("Grade 11".to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .expect("Failed to insert year level");

    let first_sem = insert_semester(&db, "1st Semester").await;
    let teacher = insert_user(&db, "teacher", user::UserRole::Teacher).await;

    let section = section::ActiveModel {
        name: Set("Einstein".to_string()),
        strand_id: Set(Some(stem.id)),
        year_level_id: Set(Some(grade_11.id)),
        advisory_teacher_id: Set(Some(teacher.id)),
        ..Default::default()
    }
    .insert(&db)
    .await
    .expect("Failed to insert section");

    let math = insert_subject(&db, "MATH101", first_sem.id, Some(stem.id), Some(grade_11.id)).await;

    let student_user = insert_user(&db, "student", user::UserRole::Student).await;
    let student = insert_student(
        &db,
        student_user.id,
        Some(stem.id),
        Some(grade_11.id),
        Some(first_sem.id),
    )
    .await;
    enrol_in_section(&db, student.id, section.id).await;
    enrol_in_subject(&db, student.id, math.id).await;

    School {
        db,
        stem,
        grade_11,
        first_sem,
        teacher,
        section,
        math,
        student_user,
        student,
    }
}
