//! Project entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    /// Uppercase short code used as the prefix of test case and run codes
    pub code: String,
    pub owner_id: Uuid,
    pub is_active: bool,
    pub is_public: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test_case::Entity")]
    TestCases,
    #[sea_orm(has_many = "super::test_plan::Entity")]
    TestPlans,
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCases.def()
    }
}

impl Related<super::test_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestPlans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
