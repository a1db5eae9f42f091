//! Database queries for test cases.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait, Func, LikeExpr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::entity::test_case::{self, Entity as TestCase};
use crate::entity::test_run::{self, Entity as TestRun};
use crate::error::AppResult;

use super::DbPool;

/// Find a live test case by ID.
pub async fn find_live<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> AppResult<Option<test_case::Model>> {
    let result = TestCase::find_by_id(id)
        .filter(test_case::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(result)
}

/// Row-lock a live test case without changing it, optionally requiring it to
/// belong to `project_id`. Returns false when no such live case exists.
///
/// Deletion and run creation both lock the case first, so a case cannot be
/// tombstoned while a run referencing it is being inserted.
pub async fn lock_live<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    project_id: Option<Uuid>,
) -> AppResult<bool> {
    let mut update = TestCase::update_many()
        .col_expr(test_case::Column::DeletedAt, Expr::col(test_case::Column::DeletedAt))
        .filter(test_case::Column::Id.eq(id))
        .filter(test_case::Column::DeletedAt.is_null());

    if let Some(project_id) = project_id {
        update = update.filter(test_case::Column::ProjectId.eq(project_id));
    }

    Ok(update.exec(db).await?.rows_affected > 0)
}

/// Row-lock every live test case of a project. Returns how many were locked.
pub async fn lock_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> AppResult<u64> {
    let result = TestCase::update_many()
        .col_expr(test_case::Column::DeletedAt, Expr::col(test_case::Column::DeletedAt))
        .filter(test_case::Column::ProjectId.eq(project_id))
        .filter(test_case::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Whether any test run references the test case.
pub async fn is_referenced<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<bool> {
    let count = TestRun::find()
        .filter(test_run::Column::TestCaseId.eq(id))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Tombstone a single live test case. Returns false when nothing was live.
pub async fn tombstone<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = TestCase::update_many()
        .col_expr(test_case::Column::DeletedAt, Expr::value(Some(now)))
        .col_expr(test_case::Column::UpdatedAt, Expr::value(now))
        .filter(test_case::Column::Id.eq(id))
        .filter(test_case::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Runs referencing any live test case of the project.
pub async fn count_runs_referencing_project<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
) -> AppResult<u64> {
    let live_cases = Query::select()
        .column(test_case::Column::Id)
        .from(TestCase)
        .and_where(test_case::Column::ProjectId.eq(project_id))
        .and_where(test_case::Column::DeletedAt.is_null())
        .to_owned();

    let count = TestRun::find()
        .filter(test_run::Column::TestCaseId.in_subquery(live_cases))
        .count(db)
        .await?;

    Ok(count)
}

/// Tombstone every live test case of a project.
pub async fn tombstone_project<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let result = TestCase::update_many()
        .col_expr(test_case::Column::DeletedAt, Expr::value(Some(now)))
        .col_expr(test_case::Column::UpdatedAt, Expr::value(now))
        .filter(test_case::Column::ProjectId.eq(project_id))
        .filter(test_case::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Every code stored in a project, tombstoned cases included.
pub async fn codes_in_project<C: ConnectionTrait>(db: &C, project_id: Uuid) -> AppResult<Vec<String>> {
    let codes = TestCase::find()
        .select_only()
        .column(test_case::Column::Code)
        .filter(test_case::Column::ProjectId.eq(project_id))
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(codes)
}

/// Build a `LIKE` pattern matching `keyword` anywhere, lowercased, with
/// wildcard characters escaped by `\`.
///
/// SQLite's `lower()` folds ASCII only, so non-ASCII keywords match
/// case-sensitively there. PostgreSQL folds them.
pub fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

impl DbPool {
    /// Page through a project's live test cases, ordered by creation.
    pub async fn list_test_cases_by_project(
        &self,
        project_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<test_case::Model>, u64)> {
        let query = TestCase::find()
            .filter(test_case::Column::ProjectId.eq(project_id))
            .filter(test_case::Column::DeletedAt.is_null());

        let total = query.clone().count(self.connection()).await?;
        let rows = query
            .order_by_asc(test_case::Column::Id) // UUIDv7 is time-ordered
            .offset(offset)
            .limit(limit)
            .all(self.connection())
            .await?;

        Ok((rows, total))
    }

    /// Live test cases created by a user across projects.
    pub async fn list_test_cases_by_creator(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<test_case::Model>> {
        let result = TestCase::find()
            .filter(test_case::Column::CreatedById.eq(user_id))
            .filter(test_case::Column::DeletedAt.is_null())
            .order_by_asc(test_case::Column::Id)
            .all(self.connection())
            .await?;

        Ok(result)
    }

    /// Case-insensitive substring search over title and code.
    pub async fn search_test_cases(
        &self,
        project_id: Option<Uuid>,
        keyword: &str,
        limit: u64,
    ) -> AppResult<Vec<test_case::Model>> {
        let pattern = contains_pattern(keyword);
        let lower_like = |col: test_case::Column| {
            Expr::expr(Func::lower(Expr::col((TestCase, col))))
                .like(LikeExpr::new(pattern.clone()).escape('\\'))
        };

        let mut query = TestCase::find()
            .filter(test_case::Column::DeletedAt.is_null())
            .filter(
                Condition::any()
                    .add(lower_like(test_case::Column::Title))
                    .add(lower_like(test_case::Column::Code)),
            );

        if let Some(project_id) = project_id {
            query = query.filter(test_case::Column::ProjectId.eq(project_id));
        }

        // v7 ids sort in creation order
        let result = query
            .order_by_asc(test_case::Column::Id)
            .limit(limit)
            .all(self.connection())
            .await?;

        Ok(result)
    }
}
