use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_students_semester_id")
                    .table(Students::Table)
                    .col(Students::SemesterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sections_advisory_teacher_id")
                    .table(Sections::Table)
                    .col(Sections::AdvisoryTeacherId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_grade_records_student_id")
                    .table(GradeRecords::Table)
                    .col(GradeRecords::StudentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_grade_records_student_id")
                    .table(GradeRecords::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_sections_advisory_teacher_id")
                    .table(Sections::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_students_semester_id")
                    .table(Students::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Students {
    Table,
    SemesterId,
}

#[derive(DeriveIden)]
enum Sections {
    Table,
    AdvisoryTeacherId,
}

#[derive(DeriveIden)]
enum GradeRecords {
    Table,
    StudentId,
}
