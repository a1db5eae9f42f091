//! Result transitions of test runs.
//!
//! A run starts `pending` and moves to `passed` or `failed` on submission;
//! resubmission overwrites the previous result. `is_closed` is orthogonal
//! and terminal: a closed run accepts no further results. Plan failure
//! counters move in the same transaction as the run they count.

use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set, TransactionTrait};
use uuid::Uuid;

use super::invites::{InviteResolver, hash_token};
use crate::db::{DbPool, invites, test_plans, test_runs};
use crate::entity::test_run;
use crate::error::{AppError, AppResult};
use crate::models::{
    PublicResultRequest, Reaction, RecordResultRequest, ResultState, StoredReaction,
    SubmissionSource, TestRun,
};

/// Longest accepted external issue link.
const MAX_ISSUE_URL_LEN: usize = 1000;

/// Tester-recorded details of a result. Replaced as a whole on resubmission.
#[derive(Debug, Clone, Default)]
struct Annotations {
    notes: Option<String>,
    actual_result: Option<String>,
    expected_result: Option<String>,
    reaction: Option<Reaction>,
}

/// A validated result submission.
///
/// Fields left `None` keep what the run already holds: anonymous
/// submissions cannot touch tester annotations, and the external issue
/// link belongs to the run rather than to one result.
#[derive(Debug, Clone)]
struct Submission {
    state: ResultState,
    source: SubmissionSource,
    submitted_by: Option<Uuid>,
    tested_on: NaiveDate,
    annotations: Option<Annotations>,
    comment: Option<String>,
    external_issue_url: Option<String>,
    close: bool,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn check_submitted_state(state: ResultState) -> AppResult<()> {
    if state == ResultState::Pending {
        return Err(AppError::Validation(
            "Submitted result must be 'passed' or 'failed'".to_string(),
        ));
    }
    Ok(())
}

impl Submission {
    fn from_user(actor: Uuid, req: &RecordResultRequest) -> AppResult<Self> {
        check_submitted_state(req.result_state)?;

        if let Some(reaction) = &req.reaction {
            reaction.validate().map_err(AppError::Validation)?;
        }

        let external_issue_url = non_blank(&req.external_issue_url);
        if let Some(url) = &external_issue_url
            && (!(url.starts_with("https://") || url.starts_with("http://"))
                || url.len() > MAX_ISSUE_URL_LEN)
        {
            return Err(AppError::Validation(format!(
                "External issue link must be an http(s) URL of at most {} characters",
                MAX_ISSUE_URL_LEN
            )));
        }

        Ok(Self {
            state: req.result_state,
            source: SubmissionSource::User,
            submitted_by: Some(actor),
            tested_on: req.tested_on.unwrap_or_else(|| Utc::now().date_naive()),
            annotations: Some(Annotations {
                notes: non_blank(&req.notes),
                actual_result: non_blank(&req.actual_result),
                expected_result: non_blank(&req.expected_result),
                reaction: req.reaction.clone(),
            }),
            comment: None,
            external_issue_url,
            close: req.close,
        })
    }

    fn from_public(req: &PublicResultRequest) -> AppResult<Self> {
        check_submitted_state(req.result_state)?;

        Ok(Self {
            state: req.result_state,
            source: SubmissionSource::PublicInvite,
            submitted_by: None,
            tested_on: Utc::now().date_naive(),
            annotations: None,
            comment: non_blank(&req.comment),
            external_issue_url: None,
            close: false,
        })
    }
}

/// Change in a plan's failure count when a run moves from `previous` to `next`.
pub fn failure_delta(previous: ResultState, next: ResultState) -> i32 {
    i32::from(next.is_failed()) - i32::from(previous.is_failed())
}

/// Lock and load a run inside `txn`.
async fn lock_run(txn: &DatabaseTransaction, run_id: Uuid) -> AppResult<Option<test_run::Model>> {
    if !test_runs::lock_run(txn, run_id).await? {
        return Ok(None);
    }
    test_runs::find_run(txn, run_id).await
}

/// Apply a submission to a locked, open run and keep the plan counter in step.
async fn apply(
    txn: &DatabaseTransaction,
    run: test_run::Model,
    submission: Submission,
) -> AppResult<test_run::Model> {
    if run.is_closed {
        return Err(AppError::RunClosed(run.code));
    }

    let previous = ResultState::parse(&run.result_state).ok_or_else(|| {
        AppError::Database(format!(
            "Test run {} has unknown result state '{}'",
            run.id, run.result_state
        ))
    })?;
    let delta = failure_delta(previous, submission.state);
    let plan_id = run.test_plan_id;

    let mut active: test_run::ActiveModel = run.into();
    active.result_state = Set(submission.state.as_str().to_string());
    active.tested_on = Set(Some(submission.tested_on));
    if let Some(annotations) = submission.annotations {
        active.notes = Set(annotations.notes);
        active.actual_result = Set(annotations.actual_result);
        active.expected_result = Set(annotations.expected_result);
        active.reaction = Set(annotations
            .reaction
            .and_then(|r| StoredReaction::new(r).to_json()));
    }
    if let Some(comment) = submission.comment {
        active.notes = Set(Some(comment));
    }
    if let Some(url) = submission.external_issue_url {
        active.external_issue_url = Set(Some(url));
    }
    active.submission_source = Set(submission.source.as_str().to_string());
    active.submitted_by_id = Set(submission.submitted_by);
    if submission.close {
        active.is_closed = Set(true);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(txn).await?;
    test_plans::adjust_failures(txn, plan_id, delta).await?;

    tracing::info!(
        run_id = %updated.id,
        plan_id = %plan_id,
        from = %previous,
        to = %submission.state,
        source = submission.source.as_str(),
        closed = updated.is_closed,
        "Recorded test result"
    );

    Ok(updated)
}

/// Record an authenticated result submission.
pub async fn record_result(
    pool: &DbPool,
    run_id: Uuid,
    actor: Uuid,
    req: &RecordResultRequest,
) -> AppResult<TestRun> {
    let submission = Submission::from_user(actor, req)?;

    let txn = pool.connection().begin().await?;
    let run = lock_run(&txn, run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test run {}", run_id)))?;
    let updated = apply(&txn, run, submission).await?;
    txn.commit().await?;

    TestRun::try_from(updated)
}

/// Record an anonymous result through an invite token.
///
/// Every token problem (unknown, revoked, expired, or no longer matching its
/// run) is reported as `InvalidToken` and nothing is written.
pub async fn record_public_result(
    pool: &DbPool,
    resolver: &dyn InviteResolver,
    req: &PublicResultRequest,
) -> AppResult<()> {
    let target = resolver.resolve(&req.token).await?;
    let submission = Submission::from_public(req)?;

    let txn = pool.connection().begin().await?;

    // The invite may have been revoked since it was resolved
    invites::find_active_by_hash(&txn, &hash_token(&req.token), Utc::now())
        .await?
        .filter(|invite| invite.id == target.invite_id)
        .ok_or(AppError::InvalidToken)?;

    let run = lock_run(&txn, target.test_run_id)
        .await?
        .filter(|run| run.test_case_id == target.test_case_id)
        .ok_or(AppError::InvalidToken)?;

    apply(&txn, run, submission).await?;
    txn.commit().await?;

    Ok(())
}

/// Close a run. Closing a closed run is a no-op.
pub async fn close_run(pool: &DbPool, run_id: Uuid, actor: Uuid) -> AppResult<TestRun> {
    let txn = pool.connection().begin().await?;
    let run = lock_run(&txn, run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test run {}", run_id)))?;

    let run = if run.is_closed {
        run
    } else {
        let mut active: test_run::ActiveModel = run.into();
        active.is_closed = Set(true);
        active.updated_at = Set(Utc::now());
        let closed = active.update(&txn).await?;
        tracing::info!(run_id = %run_id, actor = %actor, "Closed test run");
        closed
    };
    txn.commit().await?;

    TestRun::try_from(run)
}

/// Get a run.
pub async fn get_run(pool: &DbPool, run_id: Uuid) -> AppResult<TestRun> {
    let run = pool
        .get_run(run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test run {}", run_id)))?;
    TestRun::try_from(run)
}
