//! SeaORM entities for the school records database.
//!
//! Reference data (strands, year levels, semesters, subjects, sections) is
//! maintained by administrators. Students own their grades: each `students`
//! row embeds a serialized [`crate::gradebook::GradeBook`].

pub mod grade_record;
pub mod section;
pub mod section_teacher;
pub mod semester;
pub mod strand;
pub mod student;
pub mod student_section;
pub mod student_subject;
pub mod subject;
pub mod subject_section;
pub mod subject_teacher;
pub mod user;
pub mod year_level;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::grade_record::Entity as GradeRecord;
    pub use super::section::Entity as Section;
    pub use super::section_teacher::Entity as SectionTeacher;
    pub use super::semester::Entity as Semester;
    pub use super::strand::Entity as Strand;
    pub use super::student::Entity as Student;
    pub use super::student_section::Entity as StudentSection;
    pub use super::student_subject::Entity as StudentSubject;
    pub use super::subject::Entity as Subject;
    pub use super::subject_section::Entity as SubjectSection;
    pub use super::subject_teacher::Entity as SubjectTeacher;
    pub use super::user::Entity as User;
    pub use super::year_level::Entity as YearLevel;
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use crate::gradebook::{ComponentKind, GradeBook};
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    fn new_user(username: &str, role: user::UserRole) -> user::ActiveModel {
        user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set("not-a-real-hash".to_string()),
            role: Set(role),
            is_profile_complete: Set(false),
            is_active: Set(true),
            first_name: Set(None),
            middle_name: Set(None),
            last_name: Set(None),
            email: Set(None),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let stem = strand::ActiveModel {
            name: Set("STEM".to_string()),
            description: Set(Some("Science, Technology, Engineering and Mathematics".to_string())),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let grade_11 = year_level::ActiveModel {
            name: Set("Grade 11".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let first_sem = semester::ActiveModel {
            name: Set("1st Semester".to_string()),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let teacher = new_user("teacher1", user::UserRole::Teacher).insert(&db).await?;
        let student_user = new_user("student1", user::UserRole::Student).insert(&db).await?;

        let section = section::ActiveModel {
            name: Set("Einstein".to_string()),
            strand_id: Set(Some(stem.id)),
            year_level_id: Set(Some(grade_11.id)),
            advisory_teacher_id: Set(Some(teacher.id)),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let math = subject::ActiveModel {
            name: Set("General Mathematics".to_string()),
            code: Set("MATH101".to_string()),
            semester_id: Set(Some(first_sem.id)),
            strand_id: Set(Some(stem.id)),
            year_level_id: Set(Some(grade_11.id)),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let mut book = GradeBook::new();
        book.entry(first_sem.id, math.id)
            .set_component(ComponentKind::Midterm, Some(80.0));

        let student = student::ActiveModel {
            user_id: Set(student_user.id),
            lrn: Set(Some("123456789012".to_string())),
            strand_id: Set(Some(stem.id)),
            year_level_id: Set(Some(grade_11.id)),
            semester_id: Set(Some(first_sem.id)),
            grades: Set(book.to_json().unwrap()),
            revision: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        student_section::ActiveModel {
            student_id: Set(student.id),
            section_id: Set(section.id),
        }
        .insert(&db)
        .await?;

        student_subject::ActiveModel {
            student_id: Set(student.id),
            subject_id: Set(math.id),
        }
        .insert(&db)
        .await?;

        section_teacher::ActiveModel {
            section_id: Set(section.id),
            teacher_id: Set(teacher.id),
        }
        .insert(&db)
        .await?;

        // Student -> sections through the join table
        let sections = student.find_related(Section).all(&db).await?;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Einstein");

        // Student -> subjects through the join table
        let subjects = student.find_related(Subject).all(&db).await?;
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].code, "MATH101");

        // Section -> students
        let enrolled = section.find_related(Student).all(&db).await?;
        assert_eq!(enrolled.len(), 1);
        assert_eq!(enrolled[0].user_id, student_user.id);

        // Embedded grades survive the round trip through the text column
        let stored = Student::find_by_id(student.id).one(&db).await?.unwrap();
        let stored_book = stored.grade_book().unwrap();
        assert_eq!(stored_book.get(first_sem.id, math.id).unwrap().midterm, Some(80.0));

        let advised = Section::find()
            .filter(section::Column::AdvisoryTeacherId.eq(teacher.id))
            .one(&db)
            .await?;
        assert_eq!(advised.map(|s| s.id), Some(section.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_username_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;

        new_user("duplicate", user::UserRole::Student).insert(&db).await?;
        let second = new_user("duplicate", user::UserRole::Teacher).insert(&db).await;
        assert!(second.is_err());

        Ok(())
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut model = user::Model {
            id: 1,
            username: "jdoe".to_string(),
            password_hash: String::new(),
            role: user::UserRole::Student,
            is_profile_complete: false,
            is_active: true,
            first_name: None,
            middle_name: None,
            last_name: None,
            email: None,
        };
        assert_eq!(model.display_name(), "jdoe");

        model.first_name = Some("Juan".to_string());
        model.last_name = Some("Dela Cruz".to_string());
        assert_eq!(model.display_name(), "Juan Dela Cruz");
    }
}
