//! Transport-layer types shared between the HTTP handlers and the engines.
//! All payloads serialize with camelCase keys.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Placeholder for a missing section, strand, year level or subject code.
pub const NOT_AVAILABLE: &str = "N/A";
/// Group name for grades whose semester no longer resolves.
pub const UNKNOWN_SEMESTER: &str = "Unknown Semester";
/// Row name for grades whose subject no longer resolves.
pub const UNKNOWN_SUBJECT: &str = "Unknown Subject";

/// Generic API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success flag
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// An id together with a display name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NamedRef {
    pub id: i32,
    pub name: String,
}

// ===================== Grades =====================

/// The stored state of one subject grade after a write.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGradeDto {
    pub midterm: Option<f64>,
    pub finals: Option<f64>,
    pub final_rating: Option<f64>,
    /// "PASSED" or "FAILED" when both components are present
    pub action: Option<String>,
}

// ===================== Rosters =====================

/// One student as seen by a teacher.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: i32,
    pub user_id: i32,
    pub display_name: String,
    pub sections: Vec<NamedRef>,
    pub strand: Option<NamedRef>,
    pub year_level: Option<NamedRef>,
    /// True when the student belongs to the querying teacher's advisory class
    pub is_advisory: bool,
}

/// A section assigned to a teacher with its enrolled students.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionRoster {
    pub section_id: i32,
    pub section_name: String,
    /// True when the querying teacher is this section's adviser
    pub is_advisory: bool,
    pub students: Vec<StudentSummary>,
}

// ===================== Academic record =====================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub lrn: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub full_name: String,
    pub sex: String,
    pub birth_date: Option<NaiveDate>,
    pub address: String,
    pub contact_number: String,
    pub section: String,
    pub strand: String,
    pub year_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuardianInfo {
    pub name: String,
    pub relationship: String,
    pub contact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Birthplace {
    pub province: String,
    pub municipality: String,
    pub barangay: String,
}

/// One subject line of the grades block.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGradeRow {
    pub subject_id: i32,
    pub name: String,
    pub code: String,
    pub midterm: Option<f64>,
    pub finals: Option<f64>,
    pub final_rating: Option<f64>,
    pub action: Option<String>,
}

/// All grades recorded under one semester name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SemesterGradeBlock {
    pub semester_name: String,
    pub subjects: Vec<SubjectGradeRow>,
}

/// Flattened academic history of a student, ready for display or export.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcademicRecord {
    pub student_id: i32,
    pub demographics: Demographics,
    pub guardian: GuardianInfo,
    pub birthplace: Birthplace,
    pub grades: Vec<SemesterGradeBlock>,
}

impl AcademicRecord {
    /// Grades recorded under the given semester name.
    pub fn semester(&self, name: &str) -> Option<&SemesterGradeBlock> {
        self.grades.iter().find(|block| block.semester_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_uses_camel_case_keys() {
        let summary = StudentSummary {
            student_id: 1,
            user_id: 2,
            display_name: "Juan Dela Cruz".to_string(),
            sections: vec![NamedRef {
                id: 3,
                name: "Einstein".to_string(),
            }],
            strand: None,
            year_level: None,
            is_advisory: true,
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["studentId"], 1);
        assert_eq!(value["isAdvisory"], true);
        assert_eq!(value["sections"][0]["name"], "Einstein");
        assert!(value["yearLevel"].is_null());
    }

    #[test]
    fn test_semester_lookup_by_name() {
        let record = AcademicRecord {
            student_id: 1,
            demographics: Demographics {
                lrn: NOT_AVAILABLE.to_string(),
                first_name: String::new(),
                middle_name: String::new(),
                last_name: String::new(),
                full_name: String::new(),
                sex: String::new(),
                birth_date: None,
                address: String::new(),
                contact_number: String::new(),
                section: NOT_AVAILABLE.to_string(),
                strand: NOT_AVAILABLE.to_string(),
                year_level: NOT_AVAILABLE.to_string(),
            },
            guardian: GuardianInfo {
                name: String::new(),
                relationship: String::new(),
                contact: String::new(),
            },
            birthplace: Birthplace {
                province: String::new(),
                municipality: String::new(),
                barangay: String::new(),
            },
            grades: vec![SemesterGradeBlock {
                semester_name: "2nd Semester".to_string(),
                subjects: vec![],
            }],
        };

        assert!(record.semester("2nd Semester").is_some());
        assert!(record.semester("1st Semester").is_none());
    }
}
