//! Test case creation, lookup, search, update and deletion.
//!
//! Single-entity operations fail with the first error. Bulk operations
//! attempt every item in request order and report successes and per-index
//! failures together; they never abort on an item error.

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, TransactionTrait};
use uuid::Uuid;

use super::cancel::CancelSignal;
use super::code_generator::{self, CodeScope};
use crate::config::WorkflowConfig;
use crate::db::{DbPool, projects, test_cases as db};
use crate::entity::{project, test_case};
use crate::error::{AppError, AppResult};
use crate::models::{
    BulkCreateResponse, BulkDeleteResponse, BulkItemError, CreateTestCaseRequest,
    PaginationParams, Pagination, TestCase, TestCaseListResponse, TestKind,
    UpdateTestCaseRequest,
};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 500;

/// Default and maximum number of search results.
const DEFAULT_SEARCH_LIMIT: u64 = 50;
const MAX_SEARCH_LIMIT: u64 = 200;

/// Parent chains longer than this are rejected as malformed.
const MAX_PARENT_DEPTH: usize = 32;

/// Test case fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTestCase {
    pub kind: TestKind,
    pub title: String,
    pub description: String,
    pub feature: Option<String>,
    pub tags: BTreeSet<String>,
    pub is_draft: bool,
    pub parent_id: Option<Uuid>,
}

impl ValidTestCase {
    fn tags_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.tags.iter().cloned().collect::<Vec<_>>())
    }

    fn to_active_model(&self, project_id: Uuid, actor: Uuid, code: String) -> test_case::ActiveModel {
        let now = Utc::now();
        test_case::ActiveModel {
            id: Set(Uuid::now_v7()),
            project_id: Set(project_id),
            kind: Set(self.kind.as_str().to_string()),
            code: Set(code),
            feature: Set(self.feature.clone()),
            title: Set(self.title.clone()),
            description: Set(self.description.clone()),
            is_draft: Set(self.is_draft),
            tags: Set(self.tags_json()),
            parent_id: Set(self.parent_id),
            created_by_id: Set(actor),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
    }
}

/// Validate a creation request without touching the store.
///
/// Parent existence is checked separately because it needs the store.
pub fn validate(req: &CreateTestCaseRequest) -> AppResult<ValidTestCase> {
    let kind = TestKind::parse(&req.kind).ok_or_else(|| {
        AppError::Validation(format!("Unknown test case kind '{}'", req.kind))
    })?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Title exceeds {} characters",
            MAX_TITLE_LEN
        )));
    }

    let mut tags = BTreeSet::new();
    for tag in &req.tags {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::Validation("Tags must not be blank".to_string()));
        }
        tags.insert(tag.to_string());
    }

    let description = req.description.trim();
    if !req.is_draft {
        if description.is_empty() {
            return Err(AppError::Validation(
                "Description is required unless the test case is a draft".to_string(),
            ));
        }
        if tags.is_empty() {
            return Err(AppError::Validation(
                "At least one tag is required unless the test case is a draft".to_string(),
            ));
        }
    }

    let feature = req
        .feature
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string);

    Ok(ValidTestCase {
        kind,
        title: title.to_string(),
        description: description.to_string(),
        feature,
        tags,
        is_draft: req.is_draft,
        parent_id: req.parent_id,
    })
}

/// Require `parent_id` to be a live test case of the same project, and,
/// when updating `child_id`, not to make the case its own ancestor.
async fn check_parent<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    parent_id: Uuid,
    child_id: Option<Uuid>,
) -> AppResult<()> {
    let mut cursor = Some(parent_id);
    let mut depth = 0;

    while let Some(id) = cursor {
        if Some(id) == child_id {
            return Err(AppError::Validation(
                "A test case cannot be its own ancestor".to_string(),
            ));
        }
        depth += 1;
        if depth > MAX_PARENT_DEPTH {
            return Err(AppError::Validation("Parent chain is too deep".to_string()));
        }

        let node = db::find_live(db, id).await?;
        match node {
            Some(node) if node.project_id == project_id => cursor = node.parent_id,
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "Parent test case {} belongs to another project",
                    id
                )));
            }
            // Only the direct parent must be live; tombstoned ancestors end the walk
            None if id == parent_id => {
                return Err(AppError::Validation(format!(
                    "Parent test case {} does not exist",
                    id
                )));
            }
            None => cursor = None,
        }
    }

    Ok(())
}

async fn live_project(pool: &DbPool, project_id: Uuid) -> AppResult<project::Model> {
    projects::find_live(pool.connection(), project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {}", project_id)))
}

async fn insert_validated(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project: &project::Model,
    actor: Uuid,
    fields: &ValidTestCase,
) -> AppResult<TestCase> {
    let result = insert_in_txn(pool, workflow, project, actor, fields).await;
    if matches!(result, Err(AppError::CodeGenerationExhausted { .. })) {
        code_generator::resync(pool.connection(), CodeScope::TestCase, project).await?;
    }
    result
}

async fn insert_in_txn(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project: &project::Model,
    actor: Uuid,
    fields: &ValidTestCase,
) -> AppResult<TestCase> {
    let txn = pool.connection().begin().await?;

    if let Some(parent_id) = fields.parent_id {
        check_parent(&txn, project.id, parent_id, None).await?;
    }

    let project_id = project.id;
    let model: test_case::Model = code_generator::insert_with_code(
        &txn,
        CodeScope::TestCase,
        project,
        workflow.max_code_attempts,
        |savepoint, code| {
            let active = fields.to_active_model(project_id, actor, code);
            Box::pin(async move { active.insert(savepoint).await })
        },
    )
    .await?;

    txn.commit().await?;
    TestCase::try_from(model)
}

/// Create a single test case.
pub async fn create(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project_id: Uuid,
    actor: Uuid,
    req: &CreateTestCaseRequest,
) -> AppResult<TestCase> {
    let fields = validate(req)?;
    let project = live_project(pool, project_id).await?;

    let created = insert_validated(pool, workflow, &project, actor, &fields).await?;
    tracing::info!(test_case_id = %created.id, code = %created.code, "Created test case");
    Ok(created)
}

/// Create many test cases, each in its own transaction.
pub async fn bulk_create(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project_id: Uuid,
    actor: Uuid,
    requests: &[CreateTestCaseRequest],
    cancel: &CancelSignal,
) -> AppResult<BulkCreateResponse> {
    if requests.len() > workflow.max_bulk_items {
        return Err(AppError::Validation(format!(
            "Bulk request has {} items, the limit is {}",
            requests.len(),
            workflow.max_bulk_items
        )));
    }
    let project = live_project(pool, project_id).await?;

    let mut outcome = BulkCreateResponse::default();
    for (index, req) in requests.iter().enumerate() {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let result = match validate(req) {
            Ok(fields) => insert_validated(pool, workflow, &project, actor, &fields).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(created) => outcome.created.push(created),
            Err(e) => {
                tracing::debug!(index, error = %e, "Bulk create item failed");
                outcome.errors.push(BulkItemError::new(index, &e));
            }
        }
    }

    tracing::info!(
        project_id = %project_id,
        requested = requests.len(),
        created = outcome.created.len(),
        failed = outcome.errors.len(),
        cancelled = outcome.cancelled,
        "Bulk test case creation finished"
    );

    Ok(outcome)
}

/// Apply a partial update. The merged record must pass full validation.
pub async fn update(
    pool: &DbPool,
    id: Uuid,
    actor: Uuid,
    req: &UpdateTestCaseRequest,
) -> AppResult<TestCase> {
    let txn = pool.connection().begin().await?;

    if !db::lock_live(&txn, id, None).await? {
        return Err(AppError::NotFound(format!("Test case {}", id)));
    }
    let current = TestCase::try_from(
        db::find_live(&txn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test case {}", id)))?,
    )?;

    let parent_id = match (req.parent_id, req.clear_parent) {
        (Some(parent), _) => Some(parent),
        (None, true) => None,
        (None, false) => current.parent_id,
    };
    let merged = CreateTestCaseRequest {
        kind: req
            .kind
            .clone()
            .unwrap_or_else(|| current.kind.as_str().to_string()),
        title: req.title.clone().unwrap_or(current.title),
        description: req.description.clone().unwrap_or(current.description),
        feature: req.feature.clone().or(current.feature),
        tags: req.tags.clone().unwrap_or(current.tags),
        is_draft: req.is_draft.unwrap_or(current.is_draft),
        parent_id,
    };
    let fields = validate(&merged)?;

    if let Some(parent_id) = fields.parent_id
        && Some(parent_id) != current.parent_id
    {
        check_parent(&txn, current.project_id, parent_id, Some(id)).await?;
    }

    let active = test_case::ActiveModel {
        id: Set(id),
        kind: Set(fields.kind.as_str().to_string()),
        feature: Set(fields.feature.clone()),
        title: Set(fields.title.clone()),
        description: Set(fields.description.clone()),
        is_draft: Set(fields.is_draft),
        tags: Set(fields.tags_json()),
        parent_id: Set(fields.parent_id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    let model = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(test_case_id = %id, actor = %actor, "Updated test case");
    TestCase::try_from(model)
}

/// Find a live test case.
pub async fn find_by_id(pool: &DbPool, id: Uuid) -> AppResult<TestCase> {
    let model = db::find_live(pool.connection(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test case {}", id)))?;
    TestCase::try_from(model)
}

/// Page through a project's test cases.
pub async fn find_all_by_project(
    pool: &DbPool,
    project_id: Uuid,
    params: &PaginationParams,
) -> AppResult<TestCaseListResponse> {
    live_project(pool, project_id).await?;

    let limit = params.clamped_limit();
    let (rows, total) = pool
        .list_test_cases_by_project(project_id, params.offset() as u64, limit as u64)
        .await?;

    Ok(TestCaseListResponse {
        test_cases: rows
            .into_iter()
            .map(TestCase::try_from)
            .collect::<AppResult<_>>()?,
        pagination: Pagination::new(params.page(), limit, total),
    })
}

/// Test cases created by a user.
pub async fn find_all_by_creator(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<TestCase>> {
    pool.list_test_cases_by_creator(user_id)
        .await?
        .into_iter()
        .map(TestCase::try_from)
        .collect()
}

/// Case-insensitive keyword search over title and code.
pub async fn search(
    pool: &DbPool,
    project_id: Option<Uuid>,
    keyword: &str,
    limit: Option<u64>,
) -> AppResult<Vec<TestCase>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::Validation("Search keyword is required".to_string()));
    }
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

    pool.search_test_cases(project_id, keyword, limit)
        .await?
        .into_iter()
        .map(TestCase::try_from)
        .collect()
}

/// Tombstone a test case that no run references.
pub async fn delete(pool: &DbPool, id: Uuid) -> AppResult<()> {
    delete_scoped(pool, id, None).await
}

async fn delete_scoped(pool: &DbPool, id: Uuid, project_id: Option<Uuid>) -> AppResult<()> {
    let txn = pool.connection().begin().await?;

    if !db::lock_live(&txn, id, project_id).await? {
        return Err(AppError::NotFound(format!("Test case {}", id)));
    }
    if db::is_referenced(&txn, id).await? {
        return Err(AppError::Conflict(format!(
            "Test case {} is referenced by test runs",
            id
        )));
    }
    db::tombstone(&txn, id, Utc::now()).await?;
    txn.commit().await?;

    tracing::info!(test_case_id = %id, "Deleted test case");
    Ok(())
}

/// Delete many test cases of a project; each id succeeds or fails on its own.
///
/// Ids that are unknown or belong to another project fail with `NotFound`.
pub async fn bulk_delete(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project_id: Uuid,
    ids: &[Uuid],
    cancel: &CancelSignal,
) -> AppResult<BulkDeleteResponse> {
    if ids.len() > workflow.max_bulk_items {
        return Err(AppError::Validation(format!(
            "Bulk request has {} items, the limit is {}",
            ids.len(),
            workflow.max_bulk_items
        )));
    }

    let mut outcome = BulkDeleteResponse::default();
    for (index, id) in ids.iter().enumerate() {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }
        match delete_scoped(pool, *id, Some(project_id)).await {
            Ok(()) => outcome.deleted.push(*id),
            Err(e) => outcome.errors.push(BulkItemError::new(index, &e)),
        }
    }

    tracing::info!(
        project_id = %project_id,
        requested = ids.len(),
        deleted = outcome.deleted.len(),
        failed = outcome.errors.len(),
        "Bulk test case deletion finished"
    );

    Ok(outcome)
}

/// Tombstone every live test case of a project, or none of them.
pub async fn delete_by_project(pool: &DbPool, project_id: Uuid) -> AppResult<u64> {
    let txn = pool.connection().begin().await?;

    projects::find_live(&txn, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {}", project_id)))?;

    db::lock_project(&txn, project_id).await?;
    let referencing = db::count_runs_referencing_project(&txn, project_id).await?;
    if referencing > 0 {
        return Err(AppError::Conflict(format!(
            "{} test runs reference test cases of project {}",
            referencing, project_id
        )));
    }

    let deleted = db::tombstone_project(&txn, project_id, Utc::now()).await?;
    txn.commit().await?;

    tracing::info!(project_id = %project_id, deleted, "Deleted all test cases of project");
    Ok(deleted)
}
