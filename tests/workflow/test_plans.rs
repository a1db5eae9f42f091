//! Plan fan-out: pair expansion, idempotent assignment and plan flags.

use tpm_lib::error::AppError;
use tpm_lib::models::{AddAssignmentsRequest, CreateProjectRequest, PlannedAssignment};
use tpm_lib::services::{CancelSignal, plan_builder, projects, test_case_store};

use super::test_helpers::*;

#[tokio::test]
async fn test_create_plan_fans_out_one_run_per_tester() {
    let fx = fixture().await;
    let tc = create_case(&fx, "Login works").await;

    let outcome = create_plan(&fx, vec![PlannedAssignment::new(tc.id, vec![fx.tester_a, fx.tester_b])]).await;

    assert_eq!(outcome.created.len(), 2);
    assert!(outcome.failed.is_empty());
    assert!(outcome.created.iter().all(|r| r.test_case_id == tc.id));
    assert_ne!(outcome.created[0].code, outcome.created[1].code);
    assert_eq!(outcome.plan.num_test_cases, 1);
    assert_eq!(outcome.plan.num_failures, 0);
    assert!(!outcome.plan.is_locked && !outcome.plan.is_complete);

    let runs = plan_builder::list_plan_runs(&fx.pool, outcome.plan.id).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.tested_by_id == r.assigned_to_id));
}

#[tokio::test]
async fn test_add_assignments_twice_creates_one_run() {
    let fx = fixture().await;
    let tc = create_case(&fx, "Login works").await;
    let plan = create_plan(&fx, vec![]).await.plan;

    let request = AddAssignmentsRequest {
        assignments: vec![PlannedAssignment::new(tc.id, vec![fx.tester_a])],
    };
    let first = plan_builder::add_assignments(
        &fx.pool,
        &fx.config.workflow,
        plan.id,
        fx.owner,
        &request,
        &CancelSignal::new(),
    )
    .await
    .unwrap();
    let second = plan_builder::add_assignments(
        &fx.pool,
        &fx.config.workflow,
        plan.id,
        fx.owner,
        &request,
        &CancelSignal::new(),
    )
    .await
    .unwrap();

    assert_eq!(first.created.len(), 1);
    assert!(second.created.is_empty());
    assert_eq!(second.skipped.len(), 1);
    assert_eq!(second.skipped[0].user_id, fx.tester_a);

    let runs = plan_builder::list_plan_runs(&fx.pool, plan.id).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(second.plan.num_test_cases, 1);
}

#[tokio::test]
async fn test_bad_pairs_fail_individually() {
    let fx = fixture().await;
    let tc = create_case(&fx, "Login works").await;

    let other = projects::create_project(
        &fx.pool,
        fx.owner,
        &CreateProjectRequest {
            title: "Mobile".to_string(),
            code: "MOB".to_string(),
            is_public: false,
        },
    )
    .await
    .unwrap();
    let foreign = test_case_store::create(
        &fx.pool,
        &fx.config.workflow,
        other.id,
        fx.owner,
        &valid_case("Push notifications"),
    )
    .await
    .unwrap();
    let stranger = uuid::Uuid::now_v7();

    let outcome = create_plan(
        &fx,
        vec![
            PlannedAssignment::new(tc.id, vec![fx.tester_a, stranger]),
            PlannedAssignment::new(foreign.id, vec![fx.tester_b]),
        ],
    )
    .await;

    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.failed.len(), 2);
    assert!(outcome.failed.iter().all(|f| f.error == "NOT_FOUND"));
    assert_eq!(outcome.failed[0].user_id, stranger);
    assert_eq!(outcome.failed[1].test_case_id, foreign.id);
    assert_eq!(outcome.plan.num_test_cases, 1);
}

#[tokio::test]
async fn test_locked_and_complete_plans_reject_assignments() {
    let fx = fixture().await;
    let tc = create_case(&fx, "Login works").await;
    let plan = create_plan(&fx, vec![]).await.plan;

    let locked = plan_builder::set_plan_lock(&fx.pool, plan.id, fx.owner, true).await.unwrap();
    assert!(locked.is_locked);
    let stored = fx.pool.get_plan(plan.id).await.unwrap().unwrap();
    assert!(!stored.accepts_assignments());

    let request = AddAssignmentsRequest {
        assignments: vec![PlannedAssignment::new(tc.id, vec![fx.tester_a])],
    };
    let result = plan_builder::add_assignments(
        &fx.pool,
        &fx.config.workflow,
        plan.id,
        fx.owner,
        &request,
        &CancelSignal::new(),
    )
    .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    plan_builder::set_plan_lock(&fx.pool, plan.id, fx.owner, false).await.unwrap();
    let completed = plan_builder::complete_plan(&fx.pool, plan.id, fx.owner).await.unwrap();
    assert!(completed.is_complete && completed.is_locked);
    assert!(completed.closed_at.is_some());

    // Completion is idempotent and complete plans stay locked
    let again = plan_builder::complete_plan(&fx.pool, plan.id, fx.owner).await.unwrap();
    assert_eq!(again.closed_at, completed.closed_at);
    let unlock = plan_builder::set_plan_lock(&fx.pool, plan.id, fx.owner, false).await;
    assert!(matches!(unlock, Err(AppError::Conflict(_))));

    let result = plan_builder::add_assignments(
        &fx.pool,
        &fx.config.workflow,
        plan.id,
        fx.owner,
        &request,
        &CancelSignal::new(),
    )
    .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_unlock_does_not_apply_to_a_plan_completed_meanwhile() {
    let fx = fixture().await;
    let plan = create_plan(&fx, vec![]).await.plan;

    // A completion landing between the unlock's read and its write
    assert!(fx.pool.complete_plan(plan.id, fx.owner).await.unwrap());
    assert!(!fx.pool.set_plan_lock(plan.id, false, fx.owner).await.unwrap());

    let stored = fx.pool.get_plan(plan.id).await.unwrap().unwrap();
    assert!(stored.is_complete && stored.is_locked);
    assert!(!stored.accepts_assignments());

    // Locking a complete plan again is harmless
    let relocked = plan_builder::set_plan_lock(&fx.pool, plan.id, fx.owner, true).await.unwrap();
    assert!(relocked.is_complete && relocked.is_locked);
}

#[tokio::test]
async fn test_testers_are_listed_with_run_counts() {
    let fx = fixture().await;
    let first = create_case(&fx, "Login works").await;
    let second = create_case(&fx, "Logout works").await;

    let outcome = create_plan(
        &fx,
        vec![
            PlannedAssignment::new(first.id, vec![fx.tester_a, fx.tester_b]),
            PlannedAssignment::new(second.id, vec![fx.tester_a]),
        ],
    )
    .await;
    assert_eq!(outcome.plan.num_test_cases, 2);

    let mut testers = plan_builder::list_plan_testers(&fx.pool, outcome.plan.id).await.unwrap();
    testers.sort_by(|a, b| a.username.cmp(&b.username));

    let summary: Vec<_> = testers.iter().map(|t| (t.username.as_str(), t.assigned_runs)).collect();
    assert_eq!(summary, vec![("tester-a", 2), ("tester-b", 1)]);
}

#[tokio::test]
async fn test_schedule_must_be_ordered() {
    let fx = fixture().await;
    let now = chrono::Utc::now();

    let mut request = plan_request(vec![]);
    request.start_at = Some(now);
    request.scheduled_end_at = Some(now - chrono::Duration::days(1));

    let result = plan_builder::create_plan(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &request,
        &CancelSignal::new(),
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let plans = plan_builder::list_plans(&fx.pool, fx.project.id).await.unwrap();
    assert!(plans.is_empty());
}
