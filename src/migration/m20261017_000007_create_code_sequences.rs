//! Migration: Create code_sequences table.
//!
//! Scoped counters behind test case and test run codes. Values are handed
//! out by an atomic upsert-increment, so the table is the serializing point
//! for concurrent creators across server instances.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CodeSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CodeSequences::Scope)
                            .string_len(100)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CodeSequences::NextValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CodeSequences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CodeSequences::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CodeSequences {
    Table,
    Scope,
    NextValue,
    UpdatedAt,
}
