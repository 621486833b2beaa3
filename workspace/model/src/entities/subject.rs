use sea_orm::entity::prelude::*;

/// A subject offered in a semester for a strand and year level.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
    pub semester_id: Option<i32>,
    pub strand_id: Option<i32>,
    pub year_level_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::semester::Entity",
        from = "Column::SemesterId",
        to = "super::semester::Column::Id"
    )]
    Semester,
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
    #[sea_orm(has_many = "super::subject_teacher::Entity")]
    SubjectTeacher,
    #[sea_orm(has_many = "super::subject_section::Entity")]
    SubjectSection,
}

impl Related<super::semester::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Semester.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
