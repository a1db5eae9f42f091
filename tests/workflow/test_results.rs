//! Result submissions and the plan failure counter.

use tokio_test::assert_ok;
use tpm_lib::error::AppError;
use tpm_lib::models::{
    PlannedAssignment, Reaction, RecordResultRequest, ResultState, SubmissionSource, TestRun,
};
use tpm_lib::services::{plan_builder, run_state};

use super::test_helpers::*;

/// A plan with one case assigned to both testers.
async fn two_runs(fx: &Fixture) -> (TestRun, TestRun) {
    let tc = create_case(fx, "Checkout works").await;
    let outcome = create_plan(fx, vec![PlannedAssignment::new(tc.id, vec![fx.tester_a, fx.tester_b])]).await;
    let mut runs = outcome.created.into_iter();
    match (runs.next(), runs.next()) {
        (Some(a), Some(b)) => (a, b),
        other => panic!("expected two runs, got {:?}", other),
    }
}

async fn num_failures(fx: &Fixture, run: &TestRun) -> i32 {
    plan_builder::get_plan(&fx.pool, run.test_plan_id).await.unwrap().num_failures
}

#[tokio::test]
async fn test_failure_counter_follows_transitions() {
    let fx = fixture().await;
    let (first, second) = two_runs(&fx).await;
    assert_eq!(first.result_state, ResultState::Pending);

    let failed = run_state::record_result(
        &fx.pool,
        first.id,
        fx.tester_a,
        &RecordResultRequest::with_state(ResultState::Failed),
    )
    .await
    .unwrap();
    assert_eq!(failed.result_state, ResultState::Failed);
    assert_eq!(failed.submission_source, SubmissionSource::User);
    assert_eq!(failed.submitted_by_id, Some(fx.tester_a));
    assert!(failed.tested_on.is_some());
    assert_eq!(num_failures(&fx, &first).await, 1);

    run_state::record_result(
        &fx.pool,
        second.id,
        fx.tester_b,
        &RecordResultRequest::with_state(ResultState::Failed),
    )
    .await
    .unwrap();
    assert_eq!(num_failures(&fx, &first).await, 2);

    // Failed to failed leaves the counter alone
    run_state::record_result(
        &fx.pool,
        second.id,
        fx.tester_b,
        &RecordResultRequest::with_state(ResultState::Failed),
    )
    .await
    .unwrap();
    assert_eq!(num_failures(&fx, &first).await, 2);

    run_state::record_result(
        &fx.pool,
        first.id,
        fx.tester_a,
        &RecordResultRequest::with_state(ResultState::Passed),
    )
    .await
    .unwrap();
    assert_eq!(num_failures(&fx, &first).await, 1);
}

#[tokio::test]
async fn test_result_annotations_are_stored() {
    let fx = fixture().await;
    let (run, _) = two_runs(&fx).await;

    let mut request = RecordResultRequest::with_state(ResultState::Failed);
    request.notes = Some("  Button greyed out  ".to_string());
    request.actual_result = Some("   ".to_string());
    request.reaction = Some(Reaction::Rating { score: 2 });
    request.external_issue_url = Some("https://issues.example.com/WEB-17".to_string());

    let updated = run_state::record_result(&fx.pool, run.id, fx.tester_a, &request)
        .await
        .unwrap();

    assert_eq!(updated.notes.as_deref(), Some("Button greyed out"));
    assert_eq!(updated.actual_result, None);
    assert_eq!(updated.reaction, Some(Reaction::Rating { score: 2 }));
    assert_eq!(
        updated.external_issue_url.as_deref(),
        Some("https://issues.example.com/WEB-17")
    );

    let fetched = run_state::get_run(&fx.pool, run.id).await.unwrap();
    assert_eq!(fetched.reaction, Some(Reaction::Rating { score: 2 }));
}

#[tokio::test]
async fn test_invalid_submissions_are_rejected() {
    let fx = fixture().await;
    let (run, _) = two_runs(&fx).await;

    let pending = run_state::record_result(
        &fx.pool,
        run.id,
        fx.tester_a,
        &RecordResultRequest::with_state(ResultState::Pending),
    )
    .await;
    assert!(matches!(pending, Err(AppError::Validation(_))));

    let mut bad_rating = RecordResultRequest::with_state(ResultState::Passed);
    bad_rating.reaction = Some(Reaction::Rating { score: 9 });
    let result = run_state::record_result(&fx.pool, run.id, fx.tester_a, &bad_rating).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let mut bad_link = RecordResultRequest::with_state(ResultState::Passed);
    bad_link.external_issue_url = Some("ftp://issues.example.com/1".to_string());
    let result = run_state::record_result(&fx.pool, run.id, fx.tester_a, &bad_link).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let unknown = run_state::record_result(
        &fx.pool,
        uuid::Uuid::now_v7(),
        fx.tester_a,
        &RecordResultRequest::with_state(ResultState::Passed),
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    let unchanged = run_state::get_run(&fx.pool, run.id).await.unwrap();
    assert_eq!(unchanged.result_state, ResultState::Pending);
}

#[tokio::test]
async fn test_closed_run_rejects_results() {
    let fx = fixture().await;
    let (run, _) = two_runs(&fx).await;

    let mut request = RecordResultRequest::with_state(ResultState::Failed);
    request.close = true;
    let closed = run_state::record_result(&fx.pool, run.id, fx.tester_a, &request)
        .await
        .unwrap();
    assert!(closed.is_closed);
    assert_eq!(num_failures(&fx, &run).await, 1);

    let result = run_state::record_result(
        &fx.pool,
        run.id,
        fx.tester_a,
        &RecordResultRequest::with_state(ResultState::Passed),
    )
    .await;
    assert!(matches!(result, Err(AppError::RunClosed(code)) if code == run.code));

    let after = run_state::get_run(&fx.pool, run.id).await.unwrap();
    assert_eq!(after.result_state, ResultState::Failed);
    assert_eq!(num_failures(&fx, &run).await, 1);
}

#[tokio::test]
async fn test_close_run_is_idempotent() {
    let fx = fixture().await;
    let (run, _) = two_runs(&fx).await;

    let first = assert_ok!(run_state::close_run(&fx.pool, run.id, fx.owner).await);
    let second = assert_ok!(run_state::close_run(&fx.pool, run.id, fx.owner).await);

    assert!(first.is_closed && second.is_closed);
    assert_eq!(second.result_state, ResultState::Pending);

    let missing = run_state::close_run(&fx.pool, uuid::Uuid::now_v7(), fx.owner).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_resubmission_keeps_issue_link() {
    let fx = fixture().await;
    let (run, _) = two_runs(&fx).await;

    let mut first = RecordResultRequest::with_state(ResultState::Failed);
    first.notes = Some("Spinner never stops".to_string());
    first.external_issue_url = Some("https://tracker.example.com/ISSUE-7".to_string());
    run_state::record_result(&fx.pool, run.id, fx.tester_a, &first)
        .await
        .unwrap();

    let retest = run_state::record_result(
        &fx.pool,
        run.id,
        fx.tester_a,
        &RecordResultRequest::with_state(ResultState::Passed),
    )
    .await
    .unwrap();

    assert_eq!(retest.result_state, ResultState::Passed);
    assert_eq!(
        retest.external_issue_url.as_deref(),
        Some("https://tracker.example.com/ISSUE-7")
    );
    // Annotations describe one result and are replaced with it
    assert_eq!(retest.notes, None);
}
