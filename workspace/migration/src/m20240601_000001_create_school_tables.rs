use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string_len(Users::Role, 16))
                    .col(boolean(Users::IsProfileComplete).default(false))
                    .col(boolean(Users::IsActive).default(true))
                    .col(string_null(Users::FirstName))
                    .col(string_null(Users::MiddleName))
                    .col(string_null(Users::LastName))
                    .col(string_null(Users::Email))
                    .to_owned(),
            )
            .await?;

        // Create reference tables
        manager
            .create_table(
                Table::create()
                    .table(Strands::Table)
                    .if_not_exists()
                    .col(pk_auto(Strands::Id))
                    .col(string(Strands::Name).unique_key())
                    .col(string_null(Strands::Description))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(YearLevels::Table)
                    .if_not_exists()
                    .col(pk_auto(YearLevels::Id))
                    .col(string(YearLevels::Name).unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Semesters::Table)
                    .if_not_exists()
                    .col(pk_auto(Semesters::Id))
                    .col(string(Semesters::Name))
                    .col(date(Semesters::StartDate))
                    .col(date(Semesters::EndDate))
                    .to_owned(),
            )
            .await?;

        // Create subjects table
        manager
            .create_table(
                Table::create()
                    .table(Subjects::Table)
                    .if_not_exists()
                    .col(pk_auto(Subjects::Id))
                    .col(string(Subjects::Name).unique_key())
                    .col(string(Subjects::Code).unique_key())
                    .col(integer_null(Subjects::SemesterId))
                    .col(integer_null(Subjects::StrandId))
                    .col(integer_null(Subjects::YearLevelId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_semester")
                            .from(Subjects::Table, Subjects::SemesterId)
                            .to(Semesters::Table, Semesters::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_strand")
                            .from(Subjects::Table, Subjects::StrandId)
                            .to(Strands::Table, Strands::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_year_level")
                            .from(Subjects::Table, Subjects::YearLevelId)
                            .to(YearLevels::Table, YearLevels::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create sections table
        manager
            .create_table(
                Table::create()
                    .table(Sections::Table)
                    .if_not_exists()
                    .col(pk_auto(Sections::Id))
                    .col(string(Sections::Name))
                    .col(integer_null(Sections::StrandId))
                    .col(integer_null(Sections::YearLevelId))
                    .col(integer_null(Sections::AdvisoryTeacherId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_strand")
                            .from(Sections::Table, Sections::StrandId)
                            .to(Strands::Table, Strands::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_year_level")
                            .from(Sections::Table, Sections::YearLevelId)
                            .to(YearLevels::Table, YearLevels::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_advisory_teacher")
                            .from(Sections::Table, Sections::AdvisoryTeacherId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create students table. Grades are embedded as a JSON document.
        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(pk_auto(Students::Id))
                    .col(integer(Students::UserId).unique_key())
                    .col(string_null(Students::Lrn))
                    .col(string_null(Students::Sex))
                    .col(date_null(Students::BirthDate))
                    .col(string_null(Students::Address))
                    .col(string_null(Students::ContactNumber))
                    .col(string_null(Students::GuardianName))
                    .col(string_null(Students::GuardianRelationship))
                    .col(string_null(Students::GuardianContact))
                    .col(string_null(Students::BirthplaceProvince))
                    .col(string_null(Students::BirthplaceMunicipality))
                    .col(string_null(Students::BirthplaceBarangay))
                    .col(integer_null(Students::StrandId))
                    .col(integer_null(Students::YearLevelId))
                    .col(integer_null(Students::SemesterId))
                    .col(text(Students::Grades))
                    .col(integer(Students::Revision).default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_user")
                            .from(Students::Table, Students::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_strand")
                            .from(Students::Table, Students::StrandId)
                            .to(Strands::Table, Strands::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_year_level")
                            .from(Students::Table, Students::YearLevelId)
                            .to(YearLevels::Table, YearLevels::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_semester")
                            .from(Students::Table, Students::SemesterId)
                            .to(Semesters::Table, Semesters::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Join tables
        manager
            .create_table(join_table(
                SectionStudents::Table,
                (SectionStudents::StudentId, Students::Table, Students::Id),
                (SectionStudents::SectionId, Sections::Table, Sections::Id),
                "section_students",
            ))
            .await?;

        manager
            .create_table(join_table(
                SectionTeachers::Table,
                (SectionTeachers::SectionId, Sections::Table, Sections::Id),
                (SectionTeachers::TeacherId, Users::Table, Users::Id),
                "section_teachers",
            ))
            .await?;

        manager
            .create_table(join_table(
                StudentSubjects::Table,
                (StudentSubjects::StudentId, Students::Table, Students::Id),
                (StudentSubjects::SubjectId, Subjects::Table, Subjects::Id),
                "student_subjects",
            ))
            .await?;

        manager
            .create_table(join_table(
                SubjectTeachers::Table,
                (SubjectTeachers::SubjectId, Subjects::Table, Subjects::Id),
                (SubjectTeachers::TeacherId, Users::Table, Users::Id),
                "subject_teachers",
            ))
            .await?;

        manager
            .create_table(join_table(
                SubjectSections::Table,
                (SubjectSections::SubjectId, Subjects::Table, Subjects::Id),
                (SubjectSections::SectionId, Sections::Table, Sections::Id),
                "subject_sections",
            ))
            .await?;

        // Legacy standalone grades. Subject and semester ids are not
        // constrained: rows may outlive the entities they point at.
        manager
            .create_table(
                Table::create()
                    .table(GradeRecords::Table)
                    .if_not_exists()
                    .col(pk_auto(GradeRecords::Id))
                    .col(integer(GradeRecords::StudentId))
                    .col(integer(GradeRecords::SubjectId))
                    .col(integer(GradeRecords::SemesterId))
                    .col(double_null(GradeRecords::Midterm))
                    .col(double_null(GradeRecords::Finals))
                    .col(double_null(GradeRecords::FinalRating))
                    .col(string_null(GradeRecords::Action))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grade_record_student")
                            .from(GradeRecords::Table, GradeRecords::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GradeRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubjectSections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubjectTeachers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudentSubjects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SectionTeachers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SectionStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subjects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Semesters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(YearLevels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Strands::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

/// Two-column many-to-many table; both sides cascade on delete.
fn join_table<T, A, B>(
    table: T,
    left: (A, impl IntoIden + 'static, impl IntoIden + 'static),
    right: (B, impl IntoIden + 'static, impl IntoIden + 'static),
    name: &str,
) -> TableCreateStatement
where
    T: IntoIden + Clone + 'static,
    A: IntoIden + Clone + 'static,
    B: IntoIden + Clone + 'static,
{
    let (left_col, left_table, left_key) = left;
    let (right_col, right_table, right_key) = right;

    Table::create()
        .table(table.clone())
        .if_not_exists()
        .col(integer(left_col.clone()))
        .col(integer(right_col.clone()))
        .primary_key(
            Index::create()
                .name(format!("pk_{}", name))
                .col(left_col.clone())
                .col(right_col.clone()),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{}_left", name))
                .from(table.clone(), left_col)
                .to(left_table, left_key)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{}_right", name))
                .from(table, right_col)
                .to(right_table, right_key)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
    IsProfileComplete,
    IsActive,
    FirstName,
    MiddleName,
    LastName,
    Email,
}

#[derive(DeriveIden)]
enum Strands {
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum YearLevels {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Semesters {
    Table,
    Id,
    Name,
    StartDate,
    EndDate,
}

#[derive(DeriveIden)]
enum Subjects {
    Table,
    Id,
    Name,
    Code,
    SemesterId,
    StrandId,
    YearLevelId,
}

#[derive(DeriveIden)]
enum Sections {
    Table,
    Id,
    Name,
    StrandId,
    YearLevelId,
    AdvisoryTeacherId,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    UserId,
    Lrn,
    Sex,
    BirthDate,
    Address,
    ContactNumber,
    GuardianName,
    GuardianRelationship,
    GuardianContact,
    BirthplaceProvince,
    BirthplaceMunicipality,
    BirthplaceBarangay,
    StrandId,
    YearLevelId,
    SemesterId,
    Grades,
    Revision,
}

#[derive(DeriveIden, Clone)]
enum SectionStudents {
    Table,
    StudentId,
    SectionId,
}

#[derive(DeriveIden, Clone)]
enum SectionTeachers {
    Table,
    SectionId,
    TeacherId,
}

#[derive(DeriveIden, Clone)]
enum StudentSubjects {
    Table,
    StudentId,
    SubjectId,
}

#[derive(DeriveIden, Clone)]
enum SubjectTeachers {
    Table,
    SubjectId,
    TeacherId,
}

#[derive(DeriveIden, Clone)]
enum SubjectSections {
    Table,
    SubjectId,
    SectionId,
}

#[derive(DeriveIden)]
enum GradeRecords {
    Table,
    Id,
    StudentId,
    SubjectId,
    SemesterId,
    Midterm,
    Finals,
    FinalRating,
    Action,
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;

    use crate::{Migrator, MigratorTrait};
    use super::*;

    #[tokio::test]
    async fn test_up_creates_join_tables_and_down_drops_them() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let manager = SchemaManager::new(&db);
        for table in [
            "section_students",
            "section_teachers",
            "student_subjects",
            "subject_teachers",
            "subject_sections",
            "grade_records",
        ] {
            assert!(manager.has_table(table).await.unwrap(), "missing table {}", table);
        }
        assert!(manager.has_column("students", "revision").await.unwrap());

        Migrator::down(&db, None).await.unwrap();
        assert!(!manager.has_table("section_students").await.unwrap());
        assert!(!manager.has_table("users").await.unwrap());
    }
}
