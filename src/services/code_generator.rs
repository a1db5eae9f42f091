//! Project-scoped human-readable codes for test cases and test runs.
//!
//! Values come from the `code_sequences` table, one counter per scope, so
//! allocation stays collision-free across concurrent requests and server
//! instances. Unique indexes on `(project_id, code)` remain the final guard:
//! a colliding insert resynchronizes the counter with the stored codes and
//! retries.

use futures_util::future::BoxFuture;
use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr, TransactionTrait};
use uuid::Uuid;

use crate::db::{code_sequences, test_cases, test_runs};
use crate::entity::project;
use crate::error::{AppError, AppResult, is_unique_violation};

/// What a code identifies; selects the counter and the code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeScope {
    TestCase,
    TestRun,
}

impl CodeScope {
    fn label(&self) -> &'static str {
        match self {
            Self::TestCase => "test_case",
            Self::TestRun => "test_run",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::TestCase => "TC",
            Self::TestRun => "TR",
        }
    }

    /// Counter key, e.g. `test_run:0191...`.
    pub fn key(&self, project_id: Uuid) -> String {
        format!("{}:{}", self.label(), project_id)
    }

    /// Render a code, e.g. `TC-WEB-12`.
    pub fn format(&self, project_code: &str, value: i64) -> String {
        format!("{}-{}-{}", self.prefix(), project_code, value)
    }

    /// Highest numeric suffix among `codes` that belong to this scope, or 0.
    fn highest_value(&self, project_code: &str, codes: &[String]) -> i64 {
        let prefix = format!("{}-{}-", self.prefix(), project_code);
        codes
            .iter()
            .filter_map(|code| code.strip_prefix(&prefix)?.parse::<i64>().ok())
            .max()
            .unwrap_or(0)
    }
}

/// Raise the scope's counter past every code already stored for the project.
///
/// Called on a collision inside the allocating transaction, and by callers on
/// their own connection after `CodeGenerationExhausted` so the repair
/// survives the rollback of the failed insert.
pub async fn resync<C: ConnectionTrait>(
    db: &C,
    scope: CodeScope,
    project: &project::Model,
) -> AppResult<i64> {
    let codes = match scope {
        CodeScope::TestCase => test_cases::codes_in_project(db, project.id).await?,
        CodeScope::TestRun => test_runs::codes_in_project(db, project.id).await?,
    };
    let highest = scope.highest_value(&project.code, &codes);

    code_sequences::raise_to(db, &scope.key(project.id), highest).await?;
    tracing::info!(scope = %scope.key(project.id), highest, "Resynchronized code counter");

    Ok(highest)
}

/// Insert a row under a freshly allocated code.
///
/// The counter is advanced in `txn`; each insert attempt runs in its own
/// savepoint so a unique violation leaves `txn` usable. After `max_attempts`
/// collisions the call fails with `CodeGenerationExhausted`.
pub async fn insert_with_code<T, F>(
    txn: &DatabaseTransaction,
    scope: CodeScope,
    project: &project::Model,
    max_attempts: u32,
    mut insert: F,
) -> AppResult<T>
where
    F: for<'t> FnMut(&'t DatabaseTransaction, String) -> BoxFuture<'t, Result<T, DbErr>>,
{
    let key = scope.key(project.id);

    for attempt in 1..=max_attempts {
        let value = code_sequences::next_value(txn, &key).await?;
        let code = scope.format(&project.code, value);

        let savepoint = txn.begin().await?;
        match insert(&savepoint, code.clone()).await {
            Ok(row) => {
                savepoint.commit().await?;
                return Ok(row);
            }
            Err(err) if is_unique_violation(&err) => {
                savepoint.rollback().await?;
                tracing::warn!(scope = %key, code = %code, attempt, "Code collision, drawing a fresh value");
                resync(txn, scope, project).await?;
            }
            Err(err) => {
                savepoint.rollback().await?;
                return Err(err.into());
            }
        }
    }

    tracing::error!(scope = %key, attempts = max_attempts, "Code allocation exhausted");
    Err(AppError::CodeGenerationExhausted {
        scope: key,
        attempts: max_attempts,
    })
}
