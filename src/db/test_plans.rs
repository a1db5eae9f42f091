//! Database queries for test plans.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::test_plan::{self, ActiveModel, Entity as TestPlan};
use crate::entity::test_run::{self, Entity as TestRun};
use crate::error::AppResult;
use crate::models::TestKind;

use super::DbPool;

/// Plan header to be inserted.
pub struct NewTestPlan {
    pub project_id: Uuid,
    pub created_by_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub kind: TestKind,
    pub description: String,
    pub start_at: Option<DateTime<Utc>>,
    pub scheduled_end_at: Option<DateTime<Utc>>,
}

/// Find a plan by ID.
pub async fn find_plan<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<test_plan::Model>> {
    Ok(TestPlan::find_by_id(id).one(db).await?)
}

/// Take the plan's row lock by touching it. Returns false for an unknown plan.
///
/// Every writer that changes runs or counters of a plan goes through here
/// first, so lock order is always plan row, then sequence and run rows.
pub async fn lock_plan<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    actor: Option<Uuid>,
) -> AppResult<bool> {
    let mut update = TestPlan::update_many()
        .col_expr(test_plan::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(test_plan::Column::Id.eq(id));

    if let Some(actor) = actor {
        update = update.col_expr(test_plan::Column::UpdatedById, Expr::value(actor));
    }

    let result = update.exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Recompute `num_test_cases` as the distinct test cases across the plan's runs.
pub async fn recompute_num_test_cases<C: ConnectionTrait>(db: &C, plan_id: Uuid) -> AppResult<i32> {
    let distinct = TestRun::find()
        .select_only()
        .column(test_run::Column::TestCaseId)
        .distinct()
        .filter(test_run::Column::TestPlanId.eq(plan_id))
        .count(db)
        .await?;

    let num_test_cases = i32::try_from(distinct).unwrap_or(i32::MAX);

    TestPlan::update_many()
        .col_expr(test_plan::Column::NumTestCases, Expr::value(num_test_cases))
        .filter(test_plan::Column::Id.eq(plan_id))
        .exec(db)
        .await?;

    Ok(num_test_cases)
}

/// Atomically shift `num_failures` by `delta`.
pub async fn adjust_failures<C: ConnectionTrait>(db: &C, plan_id: Uuid, delta: i32) -> AppResult<()> {
    if delta == 0 {
        return Ok(());
    }

    TestPlan::update_many()
        .col_expr(
            test_plan::Column::NumFailures,
            Expr::col(test_plan::Column::NumFailures).add(delta),
        )
        .filter(test_plan::Column::Id.eq(plan_id))
        .exec(db)
        .await?;

    Ok(())
}

impl DbPool {
    /// Insert a plan header with zeroed counters.
    pub async fn insert_plan(&self, new: NewTestPlan) -> AppResult<test_plan::Model> {
        let now = Utc::now();

        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(new.project_id),
            assigned_to_id: Set(new.assigned_to_id),
            created_by_id: Set(new.created_by_id),
            updated_by_id: Set(new.created_by_id),
            kind: Set(new.kind.as_str().to_string()),
            description: Set(new.description),
            start_at: Set(new.start_at),
            closed_at: Set(None),
            scheduled_end_at: Set(new.scheduled_end_at),
            num_test_cases: Set(0),
            num_failures: Set(0),
            is_complete: Set(false),
            is_locked: Set(false),
            has_report: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(self.connection()).await?)
    }

    /// Get a plan by ID.
    pub async fn get_plan(&self, id: Uuid) -> AppResult<Option<test_plan::Model>> {
        find_plan(self.connection(), id).await
    }

    /// Plans of a project, newest first.
    pub async fn list_plans(&self, project_id: Uuid) -> AppResult<Vec<test_plan::Model>> {
        let result = TestPlan::find()
            .filter(test_plan::Column::ProjectId.eq(project_id))
            .order_by_desc(test_plan::Column::Id)
            .all(self.connection())
            .await?;

        Ok(result)
    }

    /// Set or clear the lock flag. Returns false for an unknown plan, and
    /// when unlocking a plan that is complete by the time the update runs.
    pub async fn set_plan_lock(&self, id: Uuid, locked: bool, actor: Uuid) -> AppResult<bool> {
        let mut update = TestPlan::update_many()
            .col_expr(test_plan::Column::IsLocked, Expr::value(locked))
            .col_expr(test_plan::Column::UpdatedById, Expr::value(actor))
            .col_expr(test_plan::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(test_plan::Column::Id.eq(id));
        if !locked {
            update = update.filter(test_plan::Column::IsComplete.eq(false));
        }

        let result = update.exec(self.connection()).await?;

        Ok(result.rows_affected > 0)
    }

    /// Mark an incomplete plan complete and locked. Returns false when the plan
    /// is unknown or already complete.
    pub async fn complete_plan(&self, id: Uuid, actor: Uuid) -> AppResult<bool> {
        let now = Utc::now();

        let result = TestPlan::update_many()
            .col_expr(test_plan::Column::IsComplete, Expr::value(true))
            .col_expr(test_plan::Column::IsLocked, Expr::value(true))
            .col_expr(test_plan::Column::ClosedAt, Expr::value(Some(now)))
            .col_expr(test_plan::Column::UpdatedById, Expr::value(actor))
            .col_expr(test_plan::Column::UpdatedAt, Expr::value(now))
            .filter(test_plan::Column::Id.eq(id))
            .filter(test_plan::Column::IsComplete.eq(false))
            .exec(self.connection())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
