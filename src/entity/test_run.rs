//! TestRun entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub test_plan_id: Uuid,
    pub test_case_id: Uuid,
    /// Creator of the owning plan
    pub owner_id: Uuid,
    pub tested_by_id: Uuid,
    pub assigned_to_id: Uuid,
    /// Project-scoped code, e.g. `TR-WEB-40`
    pub code: String,
    pub external_issue_url: Option<String>,
    /// pending, passed, failed
    pub result_state: String,
    pub is_closed: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub actual_result: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub expected_result: Option<String>,
    /// Versioned reaction envelope, see `models::test_run::StoredReaction`
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub reaction: Option<JsonValue>,
    pub tested_on: Option<Date>,
    /// assignment, user, public_invite
    pub submission_source: String,
    /// Absent for public invite submissions
    pub submitted_by_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::test_plan::Entity",
        from = "Column::TestPlanId",
        to = "super::test_plan::Column::Id",
        on_delete = "Cascade"
    )]
    TestPlan,
    #[sea_orm(
        belongs_to = "super::test_case::Entity",
        from = "Column::TestCaseId",
        to = "super::test_case::Column::Id",
        on_delete = "Restrict"
    )]
    TestCase,
}

impl Related<super::test_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestPlan.def()
    }
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
