//! End-to-end checks through the HTTP layer: auth, status codes and routing.

use actix_web::test;
use serde_json::json;

use tpm_lib::models::{PlannedAssignment, UserRole};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_requests_without_key_are_rejected() {
    let fx = fixture().await;
    let app = create_test_app(&fx).await;

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/v1/projects")).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/projects")
            .insert_header(("X-API-Key", "tpm_not-a-real-key")),
    )
    .await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_admin_bootstraps_user_and_key() {
    let fx = fixture().await;
    let app = create_test_app(&fx).await;

    let (status, user) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/admin/users")
            .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
            .set_json(json!({ "username": "qa-lead", "role": "member" })),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(user["username"], "qa-lead");

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/admin/users")
            .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
            .set_json(json!({ "username": "qa-lead" })),
    )
    .await;
    assert_eq!(status, 409);

    let user_id = user["id"].as_str().unwrap();
    let (status, created) = send(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/admin/users/{}/api-keys", user_id))
            .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
            .set_json(json!({ "name": "laptop" })),
    )
    .await;
    assert_eq!(status, 201);
    let key = created["key"].as_str().unwrap().to_string();

    let (status, listing) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/projects")
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(listing["projects"].as_array().map(Vec::len), Some(1));

    // Member keys cannot reach admin routes
    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/admin/users")
            .insert_header(("X-API-Key", key.as_str()))
            .set_json(json!({ "username": "sneaky" })),
    )
    .await;
    assert_eq!(status, 403);

    let key_id = created["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/admin/api-keys/{}", key_id))
            .insert_header(("X-Admin-Key", TEST_ADMIN_KEY)),
    )
    .await;
    assert_eq!(status, 204);

    let (status, _) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/projects")
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_viewer_cannot_write() {
    let fx = fixture().await;
    let viewer = create_user(&fx.pool, "auditor", UserRole::Viewer).await;
    let key = api_key_for(&fx.pool, viewer).await;
    let app = create_test_app(&fx).await;

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(("X-API-Key", key.as_str()))
            .set_json(json!({ "title": "Audit", "code": "AUD" })),
    )
    .await;
    assert_eq!(status, 401);

    let (status, _) = send(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/projects/{}", fx.project.id))
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 200);
}

#[actix_rt::test]
async fn test_project_and_bulk_test_cases() {
    let fx = fixture().await;
    let key = api_key_for(&fx.pool, fx.owner).await;
    let app = create_test_app(&fx).await;

    let (status, project) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(("X-API-Key", key.as_str()))
            .set_json(json!({ "title": "Desktop app", "code": "DSK" })),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(project["code"], "DSK");

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(("X-API-Key", key.as_str()))
            .set_json(json!({ "title": "Duplicate", "code": "DSK" })),
    )
    .await;
    assert_eq!(status, 409);

    let project_id = project["id"].as_str().unwrap();
    let (status, bulk) = send(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/projects/{}/test-cases/bulk", project_id))
            .insert_header(("X-API-Key", key.as_str()))
            .set_json(json!({
                "test_cases": [
                    { "kind": "regression", "title": "Window opens", "description": "Launch", "tags": ["smoke"] },
                    { "kind": "nonsense", "title": "Broken", "description": "x", "tags": ["a"] },
                    { "kind": "scenario", "title": "Menu", "description": "Click around", "tags": ["ui"] }
                ]
            })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(bulk["created"].as_array().map(Vec::len), Some(2));
    assert_eq!(bulk["errors"][0]["index"], 1);
    assert_eq!(bulk["errors"][0]["error"], "VALIDATION_ERROR");
    assert_eq!(bulk["created"][0]["code"], "TC-DSK-1");
    assert_eq!(bulk["created"][1]["code"], "TC-DSK-2");

    let (status, page) = send(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/projects/{}/test-cases?page=1&limit=1", project_id))
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(page["pagination"]["total"], 2);
    assert_eq!(page["pagination"]["total_pages"], 2);
}

#[actix_rt::test]
async fn test_search_route_is_not_taken_for_an_id() {
    let fx = fixture().await;
    create_case(&fx, "Password reset email").await;
    let key = api_key_for(&fx.pool, fx.owner).await;
    let app = create_test_app(&fx).await;

    let (status, found) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/test-cases/search?q=password")
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(found["test_cases"].as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/test-cases/not-a-uuid")
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 404);

    let (status, body) = send(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/test-cases/{}", uuid::Uuid::now_v7()))
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[actix_rt::test]
async fn test_github_import_errors_use_submitted_positions() {
    let fx = fixture().await;
    let key = api_key_for(&fx.pool, fx.owner).await;
    let app = create_test_app(&fx).await;

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/projects/{}/test-cases/import/github", fx.project.id))
            .insert_header(("X-API-Key", key.as_str()))
            .set_json(json!({
                "issues": [
                    { "number": 1, "title": "Bump deps", "pull_request": {} },
                    { "number": 2, "title": "   " },
                    { "number": 3, "title": "Export fails", "labels": [{ "name": "export" }] }
                ]
            })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["created"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["created"][0]["title"], "Export fails");
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["errors"][0]["index"], 1);
    assert_eq!(body["errors"][0]["error"], "VALIDATION_ERROR");
}

#[actix_rt::test]
async fn test_result_flow_over_http() {
    let fx = fixture().await;
    let tc = create_case(&fx, "Profile update").await;
    let outcome = create_plan(&fx, vec![PlannedAssignment::new(tc.id, vec![fx.tester_a])]).await;
    let run = &outcome.created[0];
    let key = api_key_for(&fx.pool, fx.tester_a).await;
    let app = create_test_app(&fx).await;

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/test-runs/{}/results", run.id))
            .insert_header(("X-API-Key", key.as_str()))
            .set_json(json!({ "result_state": "failed", "notes": "Avatar missing" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["result_state"], "failed");

    let (status, plan) = send(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/test-plans/{}", run.test_plan_id))
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(plan["num_failures"], 1);

    let (status, invite) = send(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/test-runs/{}/invites", run.id))
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 201);
    let token = invite["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/public/results")
            .set_json(json!({ "token": token, "result_state": "passed" })),
    )
    .await;
    assert_eq!(status, 204);

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/public/results")
            .set_json(json!({ "token": "tpi_forged", "result_state": "passed" })),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "INVALID_TOKEN");

    let (status, body) = send(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/test-runs/{}", run.id))
            .insert_header(("X-API-Key", key.as_str())),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["result_state"], "passed");
    assert_eq!(body["submission_source"], "public_invite");
}

#[actix_rt::test]
async fn test_malformed_json_is_a_validation_error() {
    let fx = fixture().await;
    let key = api_key_for(&fx.pool, fx.owner).await;
    let app = create_test_app(&fx).await;

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(("X-API-Key", key.as_str()))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"title\": "),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}
