use crate::auth::{authenticate, require_admin, require_student, require_teacher};
use crate::handlers::{
    admin::{
        create_section, create_semester, create_strand, create_subject, create_year_level,
        delete_section, delete_semester, delete_strand, delete_subject, delete_year_level,
        list_sections, list_semesters, list_strands, list_subjects, list_year_levels,
    },
    auth::{login, logout, me, register},
    grades::{delete_grade_record, download_form137},
    health::health_check,
    student::{my_grades, update_profile},
    teacher::{clear_grade, subject_students, teacher_sections, upsert_grade},
    users::{create_staff_user, create_student, deactivate_user, list_students, list_users},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn teacher_routes() -> Router<AppState> {
    Router::new()
        .route("/api/teacher/grades", post(upsert_grade).delete(clear_grade))
        .route("/api/teacher/subject-students", get(subject_students))
        .route("/api/teacher/sections", get(teacher_sections))
        .route_layer(middleware::from_fn(require_teacher))
}

fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/api/student/grades", get(my_grades))
        .route("/api/student/profile", put(update_profile))
        .route_layer(middleware::from_fn(require_student))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/api/admin/users", post(create_staff_user).get(list_users))
        .route("/api/admin/users/:user_id/deactivate", put(deactivate_user))
        .route("/api/admin/students", post(create_student).get(list_students))
        // School structure
        .route("/api/admin/strands", post(create_strand).get(list_strands))
        .route("/api/admin/strands/:strand_id", delete(delete_strand))
        .route("/api/admin/year-levels", post(create_year_level).get(list_year_levels))
        .route("/api/admin/year-levels/:year_level_id", delete(delete_year_level))
        .route("/api/admin/semesters", post(create_semester).get(list_semesters))
        .route("/api/admin/semesters/:semester_id", delete(delete_semester))
        .route("/api/admin/subjects", post(create_subject).get(list_subjects))
        .route("/api/admin/subjects/:subject_id", delete(delete_subject))
        .route("/api/admin/sections", post(create_section).get(list_sections))
        .route("/api/admin/sections/:section_id", delete(delete_section))
        // Legacy grade records
        .route("/api/grades/:grade_record_id", delete(delete_grade_record))
        .route_layer(middleware::from_fn(require_admin))
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/grades/form137/:student_id", get(download_form137))
        .merge(teacher_routes())
        .merge(student_routes())
        .merge(admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Session
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .merge(authenticated)
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
