use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use common::{
    AcademicRecord, Birthplace, Demographics, GuardianInfo, NamedRef, SectionRoster,
    SemesterGradeBlock, StudentSummary, SubjectGradeDto, SubjectGradeRow,
};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::config::AppConfig;
use crate::handlers::{
    admin::{
        CreateSectionRequest, CreateSemesterRequest, CreateStrandRequest, CreateSubjectRequest,
        CreateYearLevelRequest, SectionResponse, SemesterResponse, StrandResponse,
        SubjectResponse, YearLevelResponse,
    },
    auth::{LoginRequest, RegisterRequest},
    student::UpdateProfileRequest,
    teacher::{ClearGradeRequest, GradeResponse, UpsertGradeRequest},
    users::{CreateStaffRequest, CreateStudentRequest, StudentResponse, UserResponse},
};

pub use common::ApiResponse;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache of formatted academic records
    pub cache: Cache<String, CachedData>,
    /// Bumped whenever reference data shown in records changes
    pub record_epoch: Arc<AtomicU64>,
    pub config: Arc<AppConfig>,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    AcademicRecord(AcademicRecord),
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable error message
    pub message: String,
    /// Machine readable error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::teacher::upsert_grade,
        crate::handlers::teacher::clear_grade,
        crate::handlers::teacher::subject_students,
        crate::handlers::teacher::teacher_sections,
        crate::handlers::student::my_grades,
        crate::handlers::student::update_profile,
        crate::handlers::grades::download_form137,
        crate::handlers::grades::delete_grade_record,
        crate::handlers::users::create_staff_user,
        crate::handlers::users::list_users,
        crate::handlers::users::deactivate_user,
        crate::handlers::users::create_student,
        crate::handlers::users::list_students,
        crate::handlers::admin::create_strand,
        crate::handlers::admin::list_strands,
        crate::handlers::admin::delete_strand,
        crate::handlers::admin::create_year_level,
        crate::handlers::admin::list_year_levels,
        crate::handlers::admin::delete_year_level,
        crate::handlers::admin::create_semester,
        crate::handlers::admin::list_semesters,
        crate::handlers::admin::delete_semester,
        crate::handlers::admin::create_subject,
        crate::handlers::admin::list_subjects,
        crate::handlers::admin::delete_subject,
        crate::handlers::admin::create_section,
        crate::handlers::admin::list_sections,
        crate::handlers::admin::delete_section,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            UserResponse,
            UpsertGradeRequest,
            ClearGradeRequest,
            GradeResponse,
            UpdateProfileRequest,
            CreateStaffRequest,
            CreateStudentRequest,
            StudentResponse,
            CreateStrandRequest,
            StrandResponse,
            CreateYearLevelRequest,
            YearLevelResponse,
            CreateSemesterRequest,
            SemesterResponse,
            CreateSubjectRequest,
            SubjectResponse,
            CreateSectionRequest,
            SectionResponse,
            NamedRef,
            SubjectGradeDto,
            StudentSummary,
            SectionRoster,
            Demographics,
            GuardianInfo,
            Birthplace,
            SubjectGradeRow,
            SemesterGradeBlock,
            AcademicRecord,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and session endpoints"),
        (name = "teacher", description = "Grade entry and class rosters"),
        (name = "student", description = "A student's own record and profile"),
        (name = "grades", description = "Form 137 export and legacy grade records"),
        (name = "admin", description = "School structure and account administration"),
    ),
    info(
        title = "Registrar API",
        description = "School records API: grade entry, rosters, academic records and Form 137 export",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
