//! Public invite tokens for unauthenticated result submission.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "test_run_invites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// SHA-256 of the full token; the token itself is never stored
    #[sea_orm(unique)]
    pub token_hash: String,
    pub test_case_id: Uuid,
    pub test_run_id: Uuid,
    pub created_by_id: Uuid,
    pub expires_at: DateTimeUtc,
    pub revoked_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::test_run::Entity",
        from = "Column::TestRunId",
        to = "super::test_run::Column::Id",
        on_delete = "Cascade"
    )]
    TestRun,
}

impl Related<super::test_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestRun.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
