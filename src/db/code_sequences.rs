//! Scoped counter allocation.

use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait, OnConflict, Query};
use sea_orm::{ConnectionTrait, FromQueryResult};

use crate::entity::code_sequence::{self, Column, Entity as CodeSequence};
use crate::error::{AppError, AppResult};

#[derive(Debug, FromQueryResult)]
struct SequenceValue {
    next_value: i64,
}

/// Hand out the next value for `scope` with a single upsert-increment.
///
/// The first call for a scope yields 1. The returned row stays locked until
/// the surrounding transaction ends, so concurrent allocators in the same
/// scope queue behind each other instead of racing.
pub async fn next_value<C: ConnectionTrait>(db: &C, scope: &str) -> AppResult<i64> {
    let now = Utc::now();

    let insert = Query::insert()
        .into_table(CodeSequence)
        .columns([Column::Scope, Column::NextValue, Column::UpdatedAt])
        .values([scope.into(), 1i64.into(), now.into()])
        .map_err(|e| AppError::Database(format!("Failed to build sequence upsert: {}", e)))?
        .on_conflict(
            OnConflict::column(Column::Scope)
                .value(
                    Column::NextValue,
                    Expr::col((CodeSequence, Column::NextValue)).add(1),
                )
                .value(Column::UpdatedAt, Expr::value(now))
                .to_owned(),
        )
        .returning_col(Column::NextValue)
        .to_owned();

    let stmt = db.get_database_backend().build(&insert);
    let row = SequenceValue::find_by_statement(stmt)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Database(format!("Sequence upsert for {} returned no row", scope)))?;

    Ok(row.next_value)
}

/// Raise the counter of `scope` to at least `floor`; never lowers it.
pub async fn raise_to<C: ConnectionTrait>(db: &C, scope: &str, floor: i64) -> AppResult<()> {
    use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

    let now = Utc::now();
    let existing = CodeSequence::find_by_id(scope.to_string()).one(db).await?;

    if existing.is_none() {
        code_sequence::ActiveModel {
            scope: Set(scope.to_string()),
            next_value: Set(floor),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        return Ok(());
    }

    CodeSequence::update_many()
        .col_expr(Column::NextValue, Expr::value(floor))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Scope.eq(scope))
        .filter(Column::NextValue.lt(floor))
        .exec(db)
        .await?;

    Ok(())
}
