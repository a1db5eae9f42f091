//! Migration: Create test_plans table.

use sea_orm_migration::prelude::*;

use super::m20261017_000001_create_users::Users;
use super::m20261017_000002_create_projects::Projects;
use super::m20261017_000003_create_test_cases::TEST_KINDS;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TestPlans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TestPlans::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TestPlans::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(TestPlans::AssignedToId).uuid())
                    .col(ColumnDef::new(TestPlans::CreatedById).uuid().not_null())
                    .col(ColumnDef::new(TestPlans::UpdatedById).uuid().not_null())
                    .col(
                        ColumnDef::new(TestPlans::Kind)
                            .string_len(32)
                            .not_null()
                            .check(Expr::col(TestPlans::Kind).is_in(TEST_KINDS)),
                    )
                    .col(ColumnDef::new(TestPlans::Description).text().not_null())
                    .col(ColumnDef::new(TestPlans::StartAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TestPlans::ClosedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TestPlans::ScheduledEndAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(TestPlans::NumTestCases)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TestPlans::NumFailures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TestPlans::IsComplete)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TestPlans::IsLocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TestPlans::HasReport)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TestPlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TestPlans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_plans_project_id")
                            .from(TestPlans::Table, TestPlans::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_plans_created_by_id")
                            .from(TestPlans::Table, TestPlans::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_plans_project_id")
                    .table(TestPlans::Table)
                    .col(TestPlans::ProjectId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestPlans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TestPlans {
    Table,
    Id,
    ProjectId,
    AssignedToId,
    CreatedById,
    UpdatedById,
    Kind,
    Description,
    StartAt,
    ClosedAt,
    ScheduledEndAt,
    NumTestCases,
    NumFailures,
    IsComplete,
    IsLocked,
    HasReport,
    CreatedAt,
    UpdatedAt,
}
