//! Test case store: validation, bulk semantics, search and deletion policy.

use tpm_lib::error::AppError;
use tpm_lib::models::{CreateTestCaseRequest, PaginationParams, PlannedAssignment, UpdateTestCaseRequest};
use tpm_lib::services::{CancelSignal, test_case_store};

use super::test_helpers::*;

#[tokio::test]
async fn test_bulk_create_reports_successes_and_failures_together() {
    let fx = fixture().await;

    let mut requests: Vec<_> = (0..10).map(|i| valid_case(&format!("Case {i}"))).collect();
    requests.insert(3, CreateTestCaseRequest {
        kind: "exploratory".to_string(),
        ..valid_case("Unknown kind")
    });
    requests.insert(7, CreateTestCaseRequest {
        title: "   ".to_string(),
        ..valid_case("")
    });

    let outcome = test_case_store::bulk_create(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &requests,
        &CancelSignal::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.created.len(), 10);
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(outcome.errors[0].index, 3);
    assert_eq!(outcome.errors[1].index, 7);
    assert!(outcome.errors.iter().all(|e| e.error == "VALIDATION_ERROR"));
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_bulk_create_over_limit_is_rejected_whole() {
    let mut fx = fixture().await;
    fx.config.workflow.max_bulk_items = 2;

    let requests: Vec<_> = (0..3).map(|i| valid_case(&format!("Case {i}"))).collect();
    let result = test_case_store::bulk_create(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &requests,
        &CancelSignal::new(),
    )
    .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    let page = test_case_store::find_all_by_project(&fx.pool, fx.project.id, &PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 0);
}

#[tokio::test]
async fn test_cancelled_bulk_create_stops_before_next_item() {
    let fx = fixture().await;
    let cancel = CancelSignal::new();
    cancel.cancel();

    let outcome = test_case_store::bulk_create(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &[valid_case("Never created")],
        &cancel,
    )
    .await
    .unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.created.is_empty());
}

#[tokio::test]
async fn test_drafts_may_omit_description_and_tags() {
    let fx = fixture().await;
    let draft = CreateTestCaseRequest {
        kind: "general".to_string(),
        title: "Sketch".to_string(),
        is_draft: true,
        ..Default::default()
    };

    let created = test_case_store::create(&fx.pool, &fx.config.workflow, fx.project.id, fx.owner, &draft)
        .await
        .unwrap();
    assert!(created.is_draft);

    let published = CreateTestCaseRequest {
        is_draft: false,
        ..draft
    };
    let result =
        test_case_store::create(&fx.pool, &fx.config.workflow, fx.project.id, fx.owner, &published)
            .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_update_merges_and_revalidates() {
    let fx = fixture().await;
    let parent = create_case(&fx, "Parent").await;
    let child = create_case(&fx, "Child").await;

    let updated = test_case_store::update(
        &fx.pool,
        child.id,
        fx.owner,
        &UpdateTestCaseRequest {
            title: Some("Child renamed".to_string()),
            parent_id: Some(parent.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.title, "Child renamed");
    assert_eq!(updated.parent_id, Some(parent.id));
    assert_eq!(updated.description, child.description);
    assert_eq!(updated.code, child.code);

    // Making the parent a child of its own child is a cycle
    let cycle = test_case_store::update(
        &fx.pool,
        parent.id,
        fx.owner,
        &UpdateTestCaseRequest {
            parent_id: Some(child.id),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(cycle, Err(AppError::Validation(_))), "{cycle:?}");

    let emptied = test_case_store::update(
        &fx.pool,
        child.id,
        fx.owner,
        &UpdateTestCaseRequest {
            tags: Some(vec![]),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(emptied, Err(AppError::Validation(_))));

    let detached = test_case_store::update(
        &fx.pool,
        child.id,
        fx.owner,
        &UpdateTestCaseRequest {
            clear_parent: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(detached.parent_id, None);
}

#[tokio::test]
async fn test_search_is_case_insensitive_over_title_and_code() {
    let fx = fixture().await;
    create_case(&fx, "Login with SSO").await;
    create_case(&fx, "Logout clears session").await;
    create_case(&fx, "100% discount_code applies").await;

    let hits = test_case_store::search(&fx.pool, Some(fx.project.id), "LOGIN", None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Login with SSO");

    let by_code = test_case_store::search(&fx.pool, None, "tc-web-2", None).await.unwrap();
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].title, "Logout clears session");

    // Wildcards in the keyword match literally
    let literal = test_case_store::search(&fx.pool, None, "0% d", None).await.unwrap();
    assert_eq!(literal.len(), 1);
    // "t c" in "Logout clears" would match an unescaped underscore
    let underscore = test_case_store::search(&fx.pool, None, "t_c", None).await.unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].title, "100% discount_code applies");

    let none = test_case_store::search(&fx.pool, None, "checkout", None).await.unwrap();
    assert!(none.is_empty());

    let empty = test_case_store::search(&fx.pool, None, "   ", None).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_search_returns_hits_in_creation_order() {
    let fx = fixture().await;
    for i in 1..=11 {
        create_case(&fx, &format!("Checkout step {i}")).await;
    }

    let hits = test_case_store::search(&fx.pool, Some(fx.project.id), "checkout", None)
        .await
        .unwrap();
    let codes: Vec<_> = hits.iter().map(|h| h.code.as_str()).collect();
    let expected: Vec<_> = (1..=11).map(|i| format!("TC-WEB-{i}")).collect();
    assert_eq!(codes, expected);
}

#[tokio::test]
async fn test_pagination_and_creator_listing() {
    let fx = fixture().await;
    for i in 0..5 {
        create_case(&fx, &format!("Case {i}")).await;
    }

    let page = test_case_store::find_all_by_project(
        &fx.pool,
        fx.project.id,
        &PaginationParams {
            page: Some(2),
            limit: Some(2),
        },
    )
    .await
    .unwrap();
    assert_eq!(page.test_cases.len(), 2);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 3);

    let mine = test_case_store::find_all_by_creator(&fx.pool, fx.owner).await.unwrap();
    assert_eq!(mine.len(), 5);
    let theirs = test_case_store::find_all_by_creator(&fx.pool, fx.tester_a).await.unwrap();
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn test_referenced_case_cannot_be_deleted() {
    let fx = fixture().await;
    let referenced = create_case(&fx, "Referenced").await;
    let free = create_case(&fx, "Free").await;
    create_plan(&fx, vec![PlannedAssignment::new(referenced.id, vec![fx.tester_a])]).await;

    let err = test_case_store::delete(&fx.pool, referenced.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(test_case_store::find_by_id(&fx.pool, referenced.id).await.is_ok());

    // All or nothing across the project
    let err = test_case_store::delete_by_project(&fx.pool, fx.project.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(test_case_store::find_by_id(&fx.pool, free.id).await.is_ok());

    test_case_store::delete(&fx.pool, free.id).await.unwrap();
    let gone = test_case_store::find_by_id(&fx.pool, free.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_bulk_delete_reports_per_item() {
    let fx = fixture().await;
    let referenced = create_case(&fx, "Referenced").await;
    let free = create_case(&fx, "Free").await;
    create_plan(&fx, vec![PlannedAssignment::new(referenced.id, vec![fx.tester_a])]).await;
    let unknown = uuid::Uuid::now_v7();

    let outcome = test_case_store::bulk_delete(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        &[free.id, referenced.id, unknown],
        &CancelSignal::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.deleted, vec![free.id]);
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!((outcome.errors[0].index, outcome.errors[0].error.as_str()), (1, "CONFLICT"));
    assert_eq!((outcome.errors[1].index, outcome.errors[1].error.as_str()), (2, "NOT_FOUND"));
}

#[tokio::test]
async fn test_delete_by_project_tombstones_everything() {
    let fx = fixture().await;
    for i in 0..3 {
        create_case(&fx, &format!("Case {i}")).await;
    }

    let deleted = test_case_store::delete_by_project(&fx.pool, fx.project.id).await.unwrap();
    assert_eq!(deleted, 3);

    let page = test_case_store::find_all_by_project(&fx.pool, fx.project.id, &PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 0);

    // Codes are not reused after deletion
    let next = create_case(&fx, "After wipe").await;
    assert_eq!(next.code, "TC-WEB-4");
}
