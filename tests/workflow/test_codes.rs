//! Code allocation: uniqueness under concurrency and collision recovery.

use std::collections::HashSet;

use sea_orm::EntityTrait;
use tpm_lib::entity::code_sequence;
use tpm_lib::error::AppError;
use tpm_lib::models::PlannedAssignment;
use tpm_lib::services::code_generator::CodeScope;
use tpm_lib::services::{CancelSignal, test_case_store};

use super::test_helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bulk_creates_yield_unique_codes() {
    const TASKS: usize = 4;
    const PER_TASK: usize = 6;

    let (pool, _dir) = create_shared_pool(TASKS as u32).await;
    let fx = fixture_on(pool).await;

    let handles: Vec<_> = (0..TASKS)
        .map(|task| {
            let pool = fx.pool.clone();
            let workflow = fx.config.workflow.clone();
            let (project_id, owner) = (fx.project.id, fx.owner);
            tokio::spawn(async move {
                let requests: Vec<_> = (0..PER_TASK)
                    .map(|i| valid_case(&format!("Case {task}-{i}")))
                    .collect();
                test_case_store::bulk_create(
                    &pool,
                    &workflow,
                    project_id,
                    owner,
                    &requests,
                    &CancelSignal::new(),
                )
                .await
            })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        for created in outcome.created {
            assert!(created.code.starts_with("TC-WEB-"));
            assert!(codes.insert(created.code), "duplicate code handed out");
        }
    }

    assert_eq!(codes.len(), TASKS * PER_TASK);
    let counter = sequence_value(&fx.pool, &CodeScope::TestCase.key(fx.project.id)).await;
    assert_eq!(counter, Some((TASKS * PER_TASK) as i64));
}

async fn clear_counters(fx: &Fixture) {
    code_sequence::Entity::delete_many()
        .exec(fx.pool.connection())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_lost_counter_catches_up_within_one_call() {
    let fx = fixture().await;
    for i in 1..=6 {
        create_case(&fx, &format!("Case {i}")).await;
    }
    clear_counters(&fx).await;

    // TC-WEB-1 collides, the counter is resynchronized from the stored codes
    let created = create_case(&fx, "Seventh").await;
    assert_eq!(created.code, "TC-WEB-7");

    let next = create_case(&fx, "Eighth").await;
    assert_eq!(next.code, "TC-WEB-8");
}

#[tokio::test]
async fn test_exhausted_allocation_recovers_on_next_call() {
    let mut fx = fixture().await;
    for title in ["First", "Second", "Third"] {
        create_case(&fx, title).await;
    }
    clear_counters(&fx).await;

    fx.config.workflow.max_code_attempts = 1;
    let err = test_case_store::create(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &valid_case("Fourth"),
    )
    .await
    .unwrap_err();
    assert!(
        matches!(err, AppError::CodeGenerationExhausted { attempts: 1, .. }),
        "{err:?}"
    );

    // The failed call rolled back, but the counter repair was kept
    let counter = sequence_value(&fx.pool, &CodeScope::TestCase.key(fx.project.id)).await;
    assert_eq!(counter, Some(3));

    let created = test_case_store::create(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &valid_case("Fourth"),
    )
    .await
    .unwrap();
    assert_eq!(created.code, "TC-WEB-4");
}

#[tokio::test]
async fn test_run_codes_use_their_own_counter() {
    let fx = fixture().await;
    let tc = create_case(&fx, "Login works").await;

    let outcome = create_plan(
        &fx,
        vec![PlannedAssignment::new(tc.id, vec![fx.tester_a, fx.tester_b])],
    )
    .await;

    let mut codes: Vec<_> = outcome.created.iter().map(|r| r.code.clone()).collect();
    codes.sort();
    assert_eq!(codes, vec!["TR-WEB-1", "TR-WEB-2"]);
    assert_eq!(tc.code, "TC-WEB-1");
}

#[tokio::test]
async fn test_lost_run_counter_recovers_during_fan_out() {
    let fx = fixture().await;
    let first = create_case(&fx, "Login works").await;
    let second = create_case(&fx, "Logout works").await;

    create_plan(&fx, vec![PlannedAssignment::new(first.id, vec![fx.tester_a, fx.tester_b])]).await;
    clear_counters(&fx).await;

    let outcome = create_plan(&fx, vec![PlannedAssignment::new(second.id, vec![fx.tester_a])]).await;
    assert!(outcome.failed.is_empty(), "{:?}", outcome.failed);
    assert_eq!(outcome.created[0].code, "TR-WEB-3");
}
