//! TestPlan entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "test_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub updated_by_id: Uuid,
    pub kind: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub start_at: Option<DateTimeUtc>,
    pub closed_at: Option<DateTimeUtc>,
    pub scheduled_end_at: Option<DateTimeUtc>,
    /// Distinct test cases across the plan's runs
    pub num_test_cases: i32,
    /// Runs whose result_state is `failed`
    pub num_failures: i32,
    pub is_complete: bool,
    pub is_locked: bool,
    pub has_report: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Plans that are locked or complete take no new assignments.
    pub fn accepts_assignments(&self) -> bool {
        !self.is_locked && !self.is_complete
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
    #[sea_orm(has_many = "super::test_run::Entity")]
    TestRuns,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::test_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestRuns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
