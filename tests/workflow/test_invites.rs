//! Public invite tokens and anonymous result submission.

use chrono::{Duration, Utc};
use tokio_test::{assert_err, assert_ok};

use tpm_lib::db::invites as invite_store;
use tpm_lib::error::AppError;
use tpm_lib::models::{
    PlannedAssignment, PublicResultRequest, Reaction, RecordResultRequest, ResultState,
    SubmissionSource, TestRun,
};
use tpm_lib::services::{InviteResolver, invites, plan_builder, run_state};

use super::test_helpers::*;

async fn single_run(fx: &Fixture) -> TestRun {
    let tc = create_case(fx, "Guest checkout works").await;
    let outcome = create_plan(fx, vec![PlannedAssignment::new(tc.id, vec![fx.tester_a])]).await;
    outcome
        .created
        .into_iter()
        .next()
        .expect("fan-out created no run")
}

fn public_request(token: &str, state: ResultState) -> PublicResultRequest {
    PublicResultRequest {
        token: token.to_string(),
        result_state: state,
        comment: Some("Works on my phone".to_string()),
    }
}

#[tokio::test]
async fn test_valid_token_records_anonymous_result() {
    let fx = fixture().await;
    let run = single_run(&fx).await;

    let invite = invites::issue_invite(&fx.pool, &fx.config.workflow, run.id, fx.owner, None)
        .await
        .unwrap();
    assert_eq!(invite.test_run_id, run.id);
    assert_eq!(invite.test_case_id, run.test_case_id);

    let target = fx.pool.resolve(&invite.token).await.unwrap();
    assert_eq!(target.invite_id, invite.invite_id);

    run_state::record_public_result(&fx.pool, &fx.pool, &public_request(&invite.token, ResultState::Failed))
        .await
        .unwrap();

    let updated = run_state::get_run(&fx.pool, run.id).await.unwrap();
    assert_eq!(updated.result_state, ResultState::Failed);
    assert_eq!(updated.submission_source, SubmissionSource::PublicInvite);
    assert_eq!(updated.submitted_by_id, None);
    assert_eq!(updated.notes.as_deref(), Some("Works on my phone"));

    let plan = plan_builder::get_plan(&fx.pool, run.test_plan_id).await.unwrap();
    assert_eq!(plan.num_failures, 1);
}

#[tokio::test]
async fn test_unknown_token_changes_nothing() {
    let fx = fixture().await;
    let run = single_run(&fx).await;

    let result = run_state::record_public_result(
        &fx.pool,
        &fx.pool,
        &public_request(&invites::generate_token(), ResultState::Failed),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidToken)));

    let unchanged = run_state::get_run(&fx.pool, run.id).await.unwrap();
    assert_eq!(unchanged.result_state, ResultState::Pending);
    assert_eq!(unchanged.submission_source, SubmissionSource::Assignment);
}

#[tokio::test]
async fn test_expired_token_is_invalid() {
    let fx = fixture().await;
    let run = single_run(&fx).await;

    let token = invites::generate_token();
    invite_store::insert_invite(
        fx.pool.connection(),
        invites::hash_token(&token),
        run.test_case_id,
        run.id,
        fx.owner,
        Utc::now() - Duration::hours(1),
    )
    .await
    .unwrap();

    let result = run_state::record_public_result(
        &fx.pool,
        &fx.pool,
        &public_request(&token, ResultState::Passed),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn test_revoked_token_is_invalid() {
    let fx = fixture().await;
    let run = single_run(&fx).await;

    let invite = invites::issue_invite(&fx.pool, &fx.config.workflow, run.id, fx.owner, Some(2))
        .await
        .unwrap();
    assert_ok!(invites::revoke_invite(&fx.pool, invite.invite_id).await);

    let result = run_state::record_public_result(
        &fx.pool,
        &fx.pool,
        &public_request(&invite.token, ResultState::Passed),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidToken)));

    // A second revoke finds no active invite
    let again = invites::revoke_invite(&fx.pool, invite.invite_id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_public_submission_respects_closed_runs() {
    let fx = fixture().await;
    let run = single_run(&fx).await;

    let invite = invites::issue_invite(&fx.pool, &fx.config.workflow, run.id, fx.owner, None)
        .await
        .unwrap();
    run_state::close_run(&fx.pool, run.id, fx.owner).await.unwrap();

    let result = run_state::record_public_result(
        &fx.pool,
        &fx.pool,
        &public_request(&invite.token, ResultState::Passed),
    )
    .await;
    assert!(matches!(result, Err(AppError::RunClosed(_))));

    let issue = invites::issue_invite(&fx.pool, &fx.config.workflow, run.id, fx.owner, None).await;
    assert!(matches!(issue, Err(AppError::RunClosed(_))));
}

#[tokio::test]
async fn test_invite_lifetime_must_be_positive() {
    let fx = fixture().await;
    let run = single_run(&fx).await;

    let err = assert_err!(
        invites::issue_invite(&fx.pool, &fx.config.workflow, run.id, fx.owner, Some(0)).await
    );
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_public_submission_keeps_tester_details() {
    let fx = fixture().await;
    let run = single_run(&fx).await;

    let mut recorded = RecordResultRequest::with_state(ResultState::Failed);
    recorded.actual_result = Some("crash".to_string());
    recorded.reaction = Some(Reaction::Emoji {
        emoji: "🐛".to_string(),
    });
    recorded.external_issue_url = Some("https://tracker.example.com/ISSUE-1".to_string());
    run_state::record_result(&fx.pool, run.id, fx.tester_a, &recorded)
        .await
        .unwrap();

    let invite = invites::issue_invite(&fx.pool, &fx.config.workflow, run.id, fx.owner, None)
        .await
        .unwrap();
    let mut anonymous = public_request(&invite.token, ResultState::Passed);
    anonymous.comment = None;
    run_state::record_public_result(&fx.pool, &fx.pool, &anonymous)
        .await
        .unwrap();

    let updated = run_state::get_run(&fx.pool, run.id).await.unwrap();
    assert_eq!(updated.result_state, ResultState::Passed);
    assert_eq!(updated.submission_source, SubmissionSource::PublicInvite);
    assert_eq!(updated.actual_result.as_deref(), Some("crash"));
    assert_eq!(
        updated.reaction,
        Some(Reaction::Emoji {
            emoji: "🐛".to_string()
        })
    );
    assert_eq!(
        updated.external_issue_url.as_deref(),
        Some("https://tracker.example.com/ISSUE-1")
    );
}
