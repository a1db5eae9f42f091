//! Test plan creation and the fan-out of test runs to testers.
//!
//! Every (test case, tester) pair is its own transaction. A failing pair
//! is reported and the fan-out moves on; the plan header and runs created
//! before it stay.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use uuid::Uuid;

use super::cancel::CancelSignal;
use super::code_generator::{self, CodeScope};
use crate::config::WorkflowConfig;
use crate::db::test_plans::{self, NewTestPlan};
use crate::db::{DbPool, projects, test_cases, test_runs, users};
use crate::entity::{project, test_plan, test_run};
use crate::error::{AppError, AppResult};
use crate::models::test_plan::expand_pairs;
use crate::models::{
    AddAssignmentsRequest, AssignmentFailure, AssignmentPair, CreatePlanRequest,
    PlanAssignmentOutcome, PlannedAssignment, ResultState, SubmissionSource, TestPlan, TestRun,
    Tester,
};

/// What happened to one pair.
enum PairResult {
    Created(TestRun),
    Skipped,
}

async fn load_plan(pool: &DbPool, plan_id: Uuid) -> AppResult<test_plan::Model> {
    pool.get_plan(plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test plan {}", plan_id)))
}

fn ensure_open(plan: &test_plan::Model) -> AppResult<()> {
    if plan.accepts_assignments() {
        return Ok(());
    }
    let state = if plan.is_complete { "complete" } else { "locked" };
    Err(AppError::Conflict(format!("Test plan {} is {}", plan.id, state)))
}

fn complete_plan_conflict(plan_id: Uuid) -> AppError {
    AppError::Conflict(format!(
        "Test plan {} is complete and cannot be unlocked",
        plan_id
    ))
}

fn check_pair_limit(workflow: &WorkflowConfig, assignments: &[PlannedAssignment]) -> AppResult<()> {
    let pairs: usize = assignments.iter().map(|a| a.user_ids.len()).sum();
    if pairs > workflow.max_bulk_items {
        return Err(AppError::Validation(format!(
            "Request has {} assignments, the limit is {}",
            pairs, workflow.max_bulk_items
        )));
    }
    Ok(())
}

/// Assign one pair, repairing the run code counter if allocation ran dry.
async fn assign_pair(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project: &project::Model,
    plan_id: Uuid,
    actor: Uuid,
    pair: AssignmentPair,
) -> AppResult<PairResult> {
    let result = assign_pair_in_txn(pool, workflow, project, plan_id, actor, pair).await;
    if matches!(result, Err(AppError::CodeGenerationExhausted { .. })) {
        code_generator::resync(pool.connection(), CodeScope::TestRun, project).await?;
    }
    result
}

/// Assign one pair inside its own transaction.
async fn assign_pair_in_txn(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project: &project::Model,
    plan_id: Uuid,
    actor: Uuid,
    pair: AssignmentPair,
) -> AppResult<PairResult> {
    let txn = pool.connection().begin().await?;

    if !test_plans::lock_plan(&txn, plan_id, Some(actor)).await? {
        return Err(AppError::NotFound(format!("Test plan {}", plan_id)));
    }
    let plan = test_plans::find_plan(&txn, plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test plan {}", plan_id)))?;
    ensure_open(&plan)?;

    if !test_cases::lock_live(&txn, pair.test_case_id, Some(plan.project_id)).await? {
        return Err(AppError::NotFound(format!(
            "Test case {} in project {}",
            pair.test_case_id, plan.project_id
        )));
    }
    users::find_by_id(&txn, pair.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", pair.user_id)))?;

    if test_runs::find_for_pair(&txn, plan_id, pair.test_case_id, pair.user_id)
        .await?
        .is_some()
    {
        txn.rollback().await?;
        return Ok(PairResult::Skipped);
    }

    let owner_id = plan.created_by_id;
    let run: test_run::Model = code_generator::insert_with_code(
        &txn,
        CodeScope::TestRun,
        project,
        workflow.max_code_attempts,
        |savepoint, code| {
            let now = Utc::now();
            let active = test_run::ActiveModel {
                id: Set(Uuid::now_v7()),
                project_id: Set(project.id),
                test_plan_id: Set(plan_id),
                test_case_id: Set(pair.test_case_id),
                owner_id: Set(owner_id),
                tested_by_id: Set(pair.user_id),
                assigned_to_id: Set(pair.user_id),
                code: Set(code),
                external_issue_url: Set(None),
                result_state: Set(ResultState::Pending.as_str().to_string()),
                is_closed: Set(false),
                notes: Set(None),
                actual_result: Set(None),
                expected_result: Set(None),
                reaction: Set(None),
                tested_on: Set(None),
                submission_source: Set(SubmissionSource::Assignment.as_str().to_string()),
                submitted_by_id: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            };
            Box::pin(async move { active.insert(savepoint).await })
        },
    )
    .await?;

    test_plans::recompute_num_test_cases(&txn, plan_id).await?;
    txn.commit().await?;

    Ok(PairResult::Created(TestRun::try_from(run)?))
}

/// Run every pair against the plan and collect the outcome.
async fn fan_out(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project: &project::Model,
    plan_id: Uuid,
    actor: Uuid,
    assignments: &[PlannedAssignment],
    cancel: &CancelSignal,
) -> AppResult<PlanAssignmentOutcome> {
    let mut created = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();
    let mut cancelled = false;

    for pair in expand_pairs(assignments) {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        match assign_pair(pool, workflow, project, plan_id, actor, pair).await {
            Ok(PairResult::Created(run)) => created.push(run),
            Ok(PairResult::Skipped) => skipped.push(pair),
            Err(e) => {
                tracing::debug!(
                    plan_id = %plan_id,
                    test_case_id = %pair.test_case_id,
                    user_id = %pair.user_id,
                    error = %e,
                    "Assignment failed"
                );
                failed.push(AssignmentFailure::new(pair, &e));
            }
        }
    }

    let plan = TestPlan::try_from(load_plan(pool, plan_id).await?)?;

    tracing::info!(
        plan_id = %plan_id,
        created = created.len(),
        skipped = skipped.len(),
        failed = failed.len(),
        cancelled,
        num_test_cases = plan.num_test_cases,
        "Plan fan-out finished"
    );

    Ok(PlanAssignmentOutcome {
        plan,
        created,
        skipped,
        failed,
        cancelled,
    })
}

/// Create a plan header, then fan out its initial assignments.
pub async fn create_plan(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    project_id: Uuid,
    actor: Uuid,
    req: &CreatePlanRequest,
    cancel: &CancelSignal,
) -> AppResult<PlanAssignmentOutcome> {
    check_pair_limit(workflow, &req.assignments)?;
    if let (Some(start), Some(end)) = (req.start_at, req.scheduled_end_at)
        && end < start
    {
        return Err(AppError::Validation(
            "Scheduled end must not precede the start".to_string(),
        ));
    }

    let project = projects::find_live(pool.connection(), project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {}", project_id)))?;

    if let Some(assignee) = req.assigned_to_id {
        users::find_by_id(pool.connection(), assignee)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", assignee)))?;
    }

    let plan = pool
        .insert_plan(NewTestPlan {
            project_id,
            created_by_id: actor,
            assigned_to_id: req.assigned_to_id,
            kind: req.kind,
            description: req.description.trim().to_string(),
            start_at: req.start_at,
            scheduled_end_at: req.scheduled_end_at,
        })
        .await?;

    tracing::info!(plan_id = %plan.id, project_id = %project_id, kind = %req.kind, "Created test plan");

    fan_out(pool, workflow, &project, plan.id, actor, &req.assignments, cancel).await
}

/// Add assignments to an existing plan; pairs that already have a run are skipped.
pub async fn add_assignments(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    plan_id: Uuid,
    actor: Uuid,
    req: &AddAssignmentsRequest,
    cancel: &CancelSignal,
) -> AppResult<PlanAssignmentOutcome> {
    check_pair_limit(workflow, &req.assignments)?;

    let plan = load_plan(pool, plan_id).await?;
    ensure_open(&plan)?;

    let project = projects::find_live(pool.connection(), plan.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {}", plan.project_id)))?;

    fan_out(pool, workflow, &project, plan_id, actor, &req.assignments, cancel).await
}

/// Get a plan.
pub async fn get_plan(pool: &DbPool, plan_id: Uuid) -> AppResult<TestPlan> {
    TestPlan::try_from(load_plan(pool, plan_id).await?)
}

/// Plans of a project.
pub async fn list_plans(pool: &DbPool, project_id: Uuid) -> AppResult<Vec<TestPlan>> {
    pool.get_project(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {}", project_id)))?;

    pool.list_plans(project_id)
        .await?
        .into_iter()
        .map(TestPlan::try_from)
        .collect()
}

/// Runs of a plan.
pub async fn list_plan_runs(pool: &DbPool, plan_id: Uuid) -> AppResult<Vec<TestRun>> {
    load_plan(pool, plan_id).await?;

    pool.list_runs_by_plan(plan_id)
        .await?
        .into_iter()
        .map(TestRun::try_from)
        .collect()
}

/// Testers assigned in a plan, with their run counts.
pub async fn list_plan_testers(pool: &DbPool, plan_id: Uuid) -> AppResult<Vec<Tester>> {
    load_plan(pool, plan_id).await?;

    let counts: HashMap<Uuid, i64> = pool.tester_run_counts(plan_id).await?.into_iter().collect();
    let testers = users::find_by_ids(pool.connection(), counts.keys().copied().collect())
        .await?
        .into_iter()
        .map(|user| {
            let assigned = counts.get(&user.id).copied().unwrap_or(0).max(0) as u64;
            Tester::from_user(user, assigned)
        })
        .collect();

    Ok(testers)
}

/// Lock or unlock a plan. Complete plans stay locked.
pub async fn set_plan_lock(
    pool: &DbPool,
    plan_id: Uuid,
    actor: Uuid,
    locked: bool,
) -> AppResult<TestPlan> {
    let plan = load_plan(pool, plan_id).await?;
    if plan.is_complete && !locked {
        return Err(complete_plan_conflict(plan_id));
    }

    if !pool.set_plan_lock(plan_id, locked, actor).await? {
        // Completed between the read and the guarded update
        let plan = load_plan(pool, plan_id).await?;
        if plan.is_complete {
            return Err(complete_plan_conflict(plan_id));
        }
        return Err(AppError::NotFound(format!("Test plan {}", plan_id)));
    }
    tracing::info!(plan_id = %plan_id, locked, "Changed plan lock");

    get_plan(pool, plan_id).await
}

/// Complete a plan. Completing a complete plan is a no-op.
pub async fn complete_plan(pool: &DbPool, plan_id: Uuid, actor: Uuid) -> AppResult<TestPlan> {
    if pool.complete_plan(plan_id, actor).await? {
        tracing::info!(plan_id = %plan_id, "Completed test plan");
    }
    get_plan(pool, plan_id).await
}
