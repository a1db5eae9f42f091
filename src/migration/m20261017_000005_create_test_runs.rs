//! Migration: Create test_runs table.
//!
//! One row per (plan, test case, tester) assignment.

use sea_orm_migration::prelude::*;

use super::m20261017_000001_create_users::Users;
use super::m20261017_000003_create_test_cases::TestCases;
use super::m20261017_000004_create_test_plans::TestPlans;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TestRuns::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TestRuns::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TestRuns::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(TestRuns::TestPlanId).uuid().not_null())
                    .col(ColumnDef::new(TestRuns::TestCaseId).uuid().not_null())
                    .col(ColumnDef::new(TestRuns::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(TestRuns::TestedById).uuid().not_null())
                    .col(ColumnDef::new(TestRuns::AssignedToId).uuid().not_null())
                    .col(ColumnDef::new(TestRuns::Code).string_len(64).not_null())
                    .col(ColumnDef::new(TestRuns::ExternalIssueUrl).string_len(1000))
                    .col(
                        ColumnDef::new(TestRuns::ResultState)
                            .string_len(16)
                            .not_null()
                            .default("pending")
                            .check(
                                Expr::col(TestRuns::ResultState)
                                    .is_in(["pending", "passed", "failed"]),
                            ),
                    )
                    .col(
                        ColumnDef::new(TestRuns::IsClosed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(TestRuns::Notes).text())
                    .col(ColumnDef::new(TestRuns::ActualResult).text())
                    .col(ColumnDef::new(TestRuns::ExpectedResult).text())
                    .col(ColumnDef::new(TestRuns::Reaction).json_binary())
                    .col(ColumnDef::new(TestRuns::TestedOn).date())
                    .col(
                        ColumnDef::new(TestRuns::SubmissionSource)
                            .string_len(20)
                            .not_null()
                            .default("assignment")
                            .check(
                                Expr::col(TestRuns::SubmissionSource)
                                    .is_in(["assignment", "user", "public_invite"]),
                            ),
                    )
                    .col(ColumnDef::new(TestRuns::SubmittedById).uuid())
                    .col(
                        ColumnDef::new(TestRuns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TestRuns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_runs_test_plan_id")
                            .from(TestRuns::Table, TestRuns::TestPlanId)
                            .to(TestPlans::Table, TestPlans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_runs_test_case_id")
                            .from(TestRuns::Table, TestRuns::TestCaseId)
                            .to(TestCases::Table, TestCases::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_runs_tested_by_id")
                            .from(TestRuns::Table, TestRuns::TestedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // A tester is assigned a given test case at most once per plan
        manager
            .create_index(
                Index::create()
                    .name("idx_test_runs_assignment")
                    .table(TestRuns::Table)
                    .col(TestRuns::TestPlanId)
                    .col(TestRuns::TestCaseId)
                    .col(TestRuns::TestedById)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_runs_project_code")
                    .table(TestRuns::Table)
                    .col(TestRuns::ProjectId)
                    .col(TestRuns::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_runs_test_case_id")
                    .table(TestRuns::Table)
                    .col(TestRuns::TestCaseId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TestRuns {
    Table,
    Id,
    ProjectId,
    TestPlanId,
    TestCaseId,
    OwnerId,
    TestedById,
    AssignedToId,
    Code,
    ExternalIssueUrl,
    ResultState,
    IsClosed,
    Notes,
    ActualResult,
    ExpectedResult,
    Reaction,
    TestedOn,
    SubmissionSource,
    SubmittedById,
    CreatedAt,
    UpdatedAt,
}
