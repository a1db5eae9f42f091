//! Migration: Create test_cases table.
//!
//! Reusable test definitions. Codes are unique per project.

use sea_orm_migration::prelude::*;

use super::m20261017_000001_create_users::Users;
use super::m20261017_000002_create_projects::Projects;

/// Allowed values of `test_cases.kind` and `test_plans.kind`.
pub const TEST_KINDS: [&str; 9] = [
    "general",
    "adhoc",
    "triage",
    "integration",
    "user_acceptance",
    "regression",
    "security",
    "user_interface",
    "scenario",
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TestCases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TestCases::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TestCases::ProjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(TestCases::Kind)
                            .string_len(32)
                            .not_null()
                            .check(Expr::col(TestCases::Kind).is_in(TEST_KINDS)),
                    )
                    .col(ColumnDef::new(TestCases::Code).string_len(64).not_null())
                    .col(ColumnDef::new(TestCases::Feature).string_len(255))
                    .col(ColumnDef::new(TestCases::Title).string_len(500).not_null())
                    .col(ColumnDef::new(TestCases::Description).text().not_null())
                    .col(
                        ColumnDef::new(TestCases::IsDraft)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(TestCases::Tags).json_binary().not_null())
                    .col(ColumnDef::new(TestCases::ParentId).uuid())
                    .col(ColumnDef::new(TestCases::CreatedById).uuid().not_null())
                    .col(
                        ColumnDef::new(TestCases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TestCases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TestCases::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_cases_project_id")
                            .from(TestCases::Table, TestCases::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_cases_parent_id")
                            .from(TestCases::Table, TestCases::ParentId)
                            .to(TestCases::Table, TestCases::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_cases_created_by_id")
                            .from(TestCases::Table, TestCases::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Serializing point for code uniqueness
        manager
            .create_index(
                Index::create()
                    .name("idx_test_cases_project_code")
                    .table(TestCases::Table)
                    .col(TestCases::ProjectId)
                    .col(TestCases::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_cases_created_by_id")
                    .table(TestCases::Table)
                    .col(TestCases::CreatedById)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestCases::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TestCases {
    Table,
    Id,
    ProjectId,
    Kind,
    Code,
    Feature,
    Title,
    Description,
    IsDraft,
    Tags,
    ParentId,
    CreatedById,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
