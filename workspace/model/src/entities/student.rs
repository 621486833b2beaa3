use sea_orm::entity::prelude::*;

use crate::gradebook::GradeBook;

/// Academic profile of a user with the `student` role.
///
/// The student's grades live inside this row as a serialized [`GradeBook`];
/// `revision` is bumped on every grade write and compared on update so that
/// two concurrent writers cannot silently drop each other's scores.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    /// Learner Reference Number.
    pub lrn: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<Date>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_relationship: Option<String>,
    pub guardian_contact: Option<String>,
    pub birthplace_province: Option<String>,
    pub birthplace_municipality: Option<String>,
    pub birthplace_barangay: Option<String>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    /// The semester the student is currently enrolled in.
    pub semester_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub grades: String,
    #[sea_orm(default_value = "0")]
    pub revision: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::strand::Entity",
        from = "Column::StrandId",
        to = "super::strand::Column::Id"
    )]
    Strand,
    #[sea_orm(
        belongs_to = "super::year_level::Entity",
        from = "Column::YearLevelId",
        to = "super::year_level::Column::Id"
    )]
    YearLevel,
    #[sea_orm(
        belongs_to = "super::semester::Entity",
        from = "Column::SemesterId",
        to = "super::semester::Column::Id"
    )]
    Semester,
    #[sea_orm(has_many = "super::student_section::Entity")]
    StudentSection,
    #[sea_orm(has_many = "super::student_subject::Entity")]
    StudentSubject,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::section::Entity> for Entity {
    fn to() -> RelationDef {
        super::student_section::Relation::Section.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::student_section::Relation::Student.def().rev())
    }
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        super::student_subject::Relation::Subject.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::student_subject::Relation::Student.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decodes the embedded grade book.
    pub fn grade_book(&self) -> Result<GradeBook, serde_json::Error> {
        GradeBook::from_json(&self.grades)
    }
}
