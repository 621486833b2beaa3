#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;

    use crate::auth::issue_token;
    use crate::config::AppConfig;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::http::HeaderValue;
    use axum_test::TestServer;
    use chrono::NaiveDate;
    use migration::{Migrator, MigratorTrait};
    use model::entities::{
        section, section_teacher, semester, strand, student, student_section, student_subject,
        subject, subject_teacher, user, user::UserRole, year_level,
    };
    use moka::future::Cache;
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use tracing_subscriber::EnvFilter;

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Configuration used by every test server.
    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            ..AppConfig::default()
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        AppState {
            db,
            cache: Cache::new(100),
            record_epoch: Arc::new(AtomicU64::new(0)),
            config: Arc::new(test_config()),
        }
    }

    /// Install a STDERR subscriber for the current test binary.
    ///
    /// The filter comes from RUST_LOG and defaults to `warn`.
    pub fn init_test_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Test server together with the state it runs on, so tests can seed data.
    pub async fn setup_test_server() -> (TestServer, AppState) {
        init_test_tracing();

        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).expect("Failed to start test server");
        (server, state)
    }

    /// Insert a user directly; the password hash is a placeholder.
    pub async fn seed_user(db: &DatabaseConnection, username: &str, role: UserRole) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set("seeded-without-password".to_string()),
            role: Set(role),
            is_profile_complete: Set(true),
            is_active: Set(true),
            first_name: Set(Some(username.to_uppercase())),
            last_name: Set(Some("Tester".to_string())),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert user")
    }

    /// `Cookie` header value carrying a valid session for `account`.
    pub fn session_for(state: &AppState, account: &user::Model) -> HeaderValue {
        let token = issue_token(&state.config, account).expect("Failed to issue token");
        HeaderValue::from_str(&format!("{}={}", state.config.cookie_name, token))
            .expect("Invalid cookie header")
    }

    /// A small school: one strand, one year level, one semester, a teacher
    /// advising one section, one subject taught by that teacher, and two
    /// students enrolled in the subject (only the first in the section).
    pub struct School {
        pub admin: user::Model,
        pub teacher: user::Model,
        pub student_user: user::Model,
        pub student: student::Model,
        pub other_student_user: user::Model,
        pub other_student: student::Model,
        pub semester_id: i32,
        pub subject_id: i32,
        pub section_id: i32,
    }

    async fn seed_student(
        db: &DatabaseConnection,
        account: &user::Model,
        strand_id: i32,
        year_level_id: i32,
        semester_id: i32,
        subject_id: i32,
    ) -> student::Model {
        let profile = student::ActiveModel {
            user_id: Set(account.id),
            lrn: Set(Some(format!("LRN-{}", account.id))),
            strand_id: Set(Some(strand_id)),
            year_level_id: Set(Some(year_level_id)),
            semester_id: Set(Some(semester_id)),
            grades: Set("[]".to_string()),
            revision: Set(0),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert student");

        student_subject::ActiveModel {
            student_id: Set(profile.id),
            subject_id: Set(subject_id),
        }
        .insert(db)
        .await
        .expect("Failed to enrol student in subject");

        profile
    }

    pub async fn seed_school(db: &DatabaseConnection) -> School {
        let admin = seed_user(db, "admin", UserRole::Admin).await;
        let teacher = seed_user(db, "teacher", UserRole::Teacher).await;
        let student_user = seed_user(db, "ana", UserRole::Student).await;
        let other_student_user = seed_user(db, "ben", UserRole::Student).await;

        let stem = strand::ActiveModel {
            name: Set("STEM".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert strand");
        let grade_11 = year_level::ActiveModel {
            name: Set("Grade 11".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert year level");
        let first_semester = semester::ActiveModel {
            name: Set("1st Semester".to_string()),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert semester");

        let math = subject::ActiveModel {
            name: Set("General Mathematics".to_string()),
            code: Set("MATH101".to_string()),
            semester_id: Set(Some(first_semester.id)),
            strand_id: Set(Some(stem.id)),
            year_level_id: Set(Some(grade_11.id)),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert subject");
        subject_teacher::ActiveModel {
            subject_id: Set(math.id),
            teacher_id: Set(teacher.id),
        }
        .insert(db)
        .await
        .expect("Failed to assign teacher");

        let einstein = section::ActiveModel {
            name: Set("Einstein".to_string()),
            strand_id: Set(Some(stem.id)),
            year_level_id: Set(Some(grade_11.id)),
            advisory_teacher_id: Set(Some(teacher.id)),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert section");
        section_teacher::ActiveModel {
            section_id: Set(einstein.id),
            teacher_id: Set(teacher.id),
        }
        .insert(db)
        .await
        .expect("Failed to assign section teacher");

        let student = seed_student(
            db,
            &student_user,
            stem.id,
            grade_11.id,
            first_semester.id,
            math.id,
        )
        .await;
        student_section::ActiveModel {
            student_id: Set(student.id),
            section_id: Set(einstein.id),
        }
        .insert(db)
        .await
        .expect("Failed to enrol student in section");

        let other_student = seed_student(
            db,
            &other_student_user,
            stem.id,
            grade_11.id,
            first_semester.id,
            math.id,
        )
        .await;

        School {
            admin,
            teacher,
            student_user,
            student,
            other_student_user,
            other_student,
            semester_id: first_semester.id,
            subject_id: math.id,
            section_id: einstein.id,
        }
    }
}
