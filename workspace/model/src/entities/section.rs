use sea_orm::entity::prelude::*;

/// A class section. Students are enrolled through `section_students`,
/// teachers are assigned through `section_teachers`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
    /// The teacher acting as homeroom adviser, if any.
    pub advisory_teacher_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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
        belongs_to = "super::user::Entity",
        from = "Column::AdvisoryTeacherId",
        to = "super::user::Column::Id"
    )]
    AdvisoryTeacher,
    #[sea_orm(has_many = "super::student_section::Entity")]
    StudentSection,
    #[sea_orm(has_many = "super::section_teacher::Entity")]
    SectionTeacher,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        super::student_section::Relation::Student.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::student_section::Relation::Section.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
