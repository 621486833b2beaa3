#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;
    use utoipa::openapi::{PathItemType, RefOr, schema::Schema};

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components");
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            _ => panic!("{} should be an object schema", name),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        let components = openapi.components.as_ref().unwrap();
        assert!(components.schemas.contains_key("ErrorResponse"));
        assert!(components.schemas.contains_key("HealthResponse"));
        assert!(components.schemas.contains_key("AcademicRecord"));
        assert!(components.schemas.contains_key("StudentSummary"));

        assert!(serde_json::to_string(&openapi).is_ok());
        assert!(serde_yaml::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");
        for field in ["message", "code", "success"] {
            assert!(properties.iter().any(|p| p == field), "missing {}", field);
        }
    }

    #[test]
    fn test_health_response_schema_structure() {
        let properties = object_properties("HealthResponse");
        for field in ["status", "version", "database"] {
            assert!(properties.iter().any(|p| p == field), "missing {}", field);
        }
    }

    #[test]
    fn test_transport_schemas_use_camel_case() {
        let properties = object_properties("StudentSummary");
        assert!(properties.iter().any(|p| p == "isAdvisory"));
        assert!(properties.iter().any(|p| p == "displayName"));

        let properties = object_properties("UpsertGradeRequest");
        assert!(properties.iter().any(|p| p == "gradeType"));
        assert!(properties.iter().any(|p| p == "gradeValue"));
    }

    #[test]
    fn test_openapi_paths_cover_every_area() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        let expected = [
            ("/health", PathItemType::Get, "GET"),
            ("/api/auth/login", PathItemType::Post, "POST"),
            ("/api/teacher/grades", PathItemType::Post, "POST"),
            ("/api/teacher/grades", PathItemType::Delete, "DELETE"),
            ("/api/teacher/subject-students", PathItemType::Get, "GET"),
            ("/api/teacher/sections", PathItemType::Get, "GET"),
            ("/api/student/grades", PathItemType::Get, "GET"),
            ("/api/student/profile", PathItemType::Put, "PUT"),
            ("/api/grades/form137/{student_id}", PathItemType::Get, "GET"),
            ("/api/grades/{grade_record_id}", PathItemType::Delete, "DELETE"),
            ("/api/admin/sections", PathItemType::Post, "POST"),
        ];
        for (path, method, verb) in expected {
            let item = paths.get(path).unwrap_or_else(|| panic!("missing path {}", path));
            assert!(item.operations.contains_key(&method), "missing {} {}", verb, path);
        }
    }

    #[test]
    fn test_grade_write_documents_error_statuses() {
        let openapi = ApiDoc::openapi();
        let operation = openapi
            .paths
            .paths
            .get("/api/teacher/grades")
            .and_then(|item| item.operations.get(&PathItemType::Post))
            .expect("grade write operation");

        for status in ["200", "400", "404", "409"] {
            assert!(operation.responses.responses.contains_key(status));
        }

        let json = serde_json::to_string(&openapi).unwrap();
        assert!(!json.contains("crate::schemas::ErrorResponse"));
    }
}
