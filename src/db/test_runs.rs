//! Database queries for test runs.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::entity::test_run::{self, Entity as TestRun};
use crate::error::AppResult;

use super::DbPool;

/// Find a run by ID.
pub async fn find_run<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<test_run::Model>> {
    Ok(TestRun::find_by_id(id).one(db).await?)
}

/// The run of a (plan, test case, tester) assignment, if any.
pub async fn find_for_pair<C: ConnectionTrait>(
    db: &C,
    plan_id: Uuid,
    test_case_id: Uuid,
    user_id: Uuid,
) -> AppResult<Option<test_run::Model>> {
    let result = TestRun::find()
        .filter(test_run::Column::TestPlanId.eq(plan_id))
        .filter(test_run::Column::TestCaseId.eq(test_case_id))
        .filter(test_run::Column::TestedById.eq(user_id))
        .one(db)
        .await?;

    Ok(result)
}

/// Take the run's row lock by touching it. Returns false for an unknown run.
pub async fn lock_run<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<bool> {
    let result = TestRun::update_many()
        .col_expr(test_run::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(test_run::Column::Id.eq(id))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Every run code stored in a project.
pub async fn codes_in_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> AppResult<Vec<String>> {
    let codes = TestRun::find()
        .select_only()
        .column(test_run::Column::Code)
        .filter(test_run::Column::ProjectId.eq(project_id))
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(codes)
}

impl DbPool {
    /// Get a run by ID.
    pub async fn get_run(&self, id: Uuid) -> AppResult<Option<test_run::Model>> {
        find_run(self.connection(), id).await
    }

    /// Runs of a plan in creation order.
    pub async fn list_runs_by_plan(&self, plan_id: Uuid) -> AppResult<Vec<test_run::Model>> {
        let result = TestRun::find()
            .filter(test_run::Column::TestPlanId.eq(plan_id))
            .order_by_asc(test_run::Column::Id) // UUIDv7 is time-ordered
            .all(self.connection())
            .await?;

        Ok(result)
    }

    /// (tester, assigned run count) for every tester of a plan.
    pub async fn tester_run_counts(&self, plan_id: Uuid) -> AppResult<Vec<(Uuid, i64)>> {
        let result = TestRun::find()
            .select_only()
            .column(test_run::Column::TestedById)
            .column_as(test_run::Column::Id.count(), "assigned_runs")
            .filter(test_run::Column::TestPlanId.eq(plan_id))
            .group_by(test_run::Column::TestedById)
            .into_tuple::<(Uuid, i64)>()
            .all(self.connection())
            .await?;

        Ok(result)
    }
}
