//! Migration: Create test_run_invites table.

use sea_orm_migration::prelude::*;

use super::m20261017_000005_create_test_runs::TestRuns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TestRunInvites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TestRunInvites::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TestRunInvites::TokenHash)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(TestRunInvites::TestCaseId).uuid().not_null())
                    .col(ColumnDef::new(TestRunInvites::TestRunId).uuid().not_null())
                    .col(ColumnDef::new(TestRunInvites::CreatedById).uuid().not_null())
                    .col(
                        ColumnDef::new(TestRunInvites::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TestRunInvites::RevokedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(TestRunInvites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_run_invites_test_run_id")
                            .from(TestRunInvites::Table, TestRunInvites::TestRunId)
                            .to(TestRuns::Table, TestRuns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestRunInvites::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TestRunInvites {
    Table,
    Id,
    TokenHash,
    TestCaseId,
    TestRunId,
    CreatedById,
    ExpiresAt,
    RevokedAt,
    CreatedAt,
}
