//! Test case API handlers, including bulk operations and imports.

use std::time::Duration;

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::ApiKeyAuth;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{
    BulkCreateResponse, BulkCreateTestCasesRequest, BulkDeleteRequest, BulkDeleteResponse,
    CreateTestCaseRequest, DeleteByProjectResponse, PaginationParams, SearchTestCasesQuery,
    TestCase, TestCaseListResponse, UpdateTestCaseRequest,
};
use crate::services::import::{self, GitHubImportRequest, RowImportRequest};
use crate::services::{CancelSignal, test_case_store};

/// Unpaginated list of test cases.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestCaseCollection {
    pub test_cases: Vec<TestCase>,
}

/// Configure test case routes.
///
/// `/test-cases/search` is registered before `/test-cases/{id}` so the
/// literal segment wins.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(search_test_cases)
        .service(create_test_case)
        .service(list_project_test_cases)
        .service(bulk_create_test_cases)
        .service(bulk_delete_test_cases)
        .service(import_github_issues)
        .service(import_rows)
        .service(delete_project_test_cases)
        .service(list_user_test_cases)
        .service(get_test_case)
        .service(update_test_case)
        .service(delete_test_case);
}

/// Run a bulk creation under the configured deadline.
async fn run_bulk_create(
    pool: &DbPool,
    config: &Config,
    project_id: Uuid,
    actor: Uuid,
    requests: &[CreateTestCaseRequest],
) -> AppResult<BulkCreateResponse> {
    let cancel = CancelSignal::new();
    let _deadline = cancel.with_deadline(Duration::from_secs(config.workflow.bulk_deadline_secs));

    test_case_store::bulk_create(pool, &config.workflow, project_id, actor, requests, &cancel).await
}

/// Create a test case.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/test-cases",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = CreateTestCaseRequest,
    responses(
        (status = 201, description = "Test case created", body = TestCase),
        (status = 400, description = "Invalid test case", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Code allocation exhausted", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/projects/{id}/test-cases")]
pub async fn create_test_case(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<CreateTestCaseRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let created = test_case_store::create(
        pool.get_ref(),
        &config.workflow,
        path.into_inner(),
        actor,
        &body,
    )
    .await?;
    Ok(HttpResponse::Created().json(created))
}

/// List a project's test cases, paginated.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/test-cases",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Project ID"),
        ("page" = Option<u32>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u32>, Query, description = "Page size (default 50, max 200)")
    ),
    responses(
        (status = 200, description = "Test cases", body = TestCaseListResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/projects/{id}/test-cases")]
pub async fn list_project_test_cases(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let page = test_case_store::find_all_by_project(pool.get_ref(), path.into_inner(), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Create many test cases. Each item succeeds or fails on its own.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/test-cases/bulk",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = BulkCreateTestCasesRequest,
    responses(
        (status = 200, description = "Created items and per-item errors", body = BulkCreateResponse),
        (status = 400, description = "Too many items", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/projects/{id}/test-cases/bulk")]
pub async fn bulk_create_test_cases(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<BulkCreateTestCasesRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let outcome =
        run_bulk_create(pool.get_ref(), &config, path.into_inner(), actor, &body.test_cases).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Delete many test cases of a project.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/test-cases/bulk-delete",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Deleted ids and per-item errors", body = BulkDeleteResponse),
        (status = 400, description = "Too many items", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/projects/{id}/test-cases/bulk-delete")]
pub async fn bulk_delete_test_cases(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<BulkDeleteRequest>,
) -> AppResult<HttpResponse> {
    auth.require_writer()?;

    let cancel = CancelSignal::new();
    let _deadline = cancel.with_deadline(Duration::from_secs(config.workflow.bulk_deadline_secs));

    let outcome = test_case_store::bulk_delete(
        pool.get_ref(),
        &config.workflow,
        path.into_inner(),
        &body.ids,
        &cancel,
    )
    .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Import GitHub issues as test cases. Pull requests are skipped; error
/// indexes refer to the submitted `issues` array.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/test-cases/import/github",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = GitHubImportRequest,
    responses(
        (status = 200, description = "Imported items and per-item errors", body = BulkCreateResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/projects/{id}/test-cases/import/github")]
pub async fn import_github_issues(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<GitHubImportRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let import = import::from_github_issues(&body.issues);
    let mut outcome =
        run_bulk_create(pool.get_ref(), &config, path.into_inner(), actor, &import.requests)
            .await?;
    import.remap_errors(&mut outcome);
    Ok(HttpResponse::Ok().json(outcome))
}

/// Import spreadsheet rows (header name to cell value) as test cases.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/test-cases/import/rows",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = RowImportRequest,
    responses(
        (status = 200, description = "Imported items and per-item errors", body = BulkCreateResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/projects/{id}/test-cases/import/rows")]
pub async fn import_rows(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<RowImportRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let requests = import::from_rows(&body.rows);
    let outcome =
        run_bulk_create(pool.get_ref(), &config, path.into_inner(), actor, &requests).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Delete every test case of a project, or none if any is referenced by a run.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}/test-cases",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Test cases deleted", body = DeleteByProjectResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Some test case is referenced by a run", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[delete("/projects/{id}/test-cases")]
pub async fn delete_project_test_cases(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    auth.require_writer()?;
    let project_id = path.into_inner();
    let deleted = test_case_store::delete_by_project(pool.get_ref(), project_id).await?;
    Ok(HttpResponse::Ok().json(DeleteByProjectResponse {
        project_id,
        deleted,
    }))
}

/// Case-insensitive keyword search over title and code.
#[utoipa::path(
    get,
    path = "/api/v1/test-cases/search",
    tag = "Test Cases",
    params(
        ("q" = String, Query, description = "Keyword"),
        ("project_id" = Option<Uuid>, Query, description = "Restrict to one project"),
        ("limit" = Option<u64>, Query, description = "Maximum results (default 50, max 200)")
    ),
    responses(
        (status = 200, description = "Matching test cases", body = TestCaseCollection),
        (status = 400, description = "Empty keyword", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/test-cases/search")]
pub async fn search_test_cases(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    query: web::Query<SearchTestCasesQuery>,
) -> AppResult<HttpResponse> {
    let test_cases =
        test_case_store::search(pool.get_ref(), query.project_id, &query.q, query.limit).await?;
    Ok(HttpResponse::Ok().json(TestCaseCollection { test_cases }))
}

/// Test cases created by a user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/test-cases",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Test cases", body = TestCaseCollection)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/users/{id}/test-cases")]
pub async fn list_user_test_cases(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let test_cases = test_case_store::find_all_by_creator(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TestCaseCollection { test_cases }))
}

/// Get a test case.
#[utoipa::path(
    get,
    path = "/api/v1/test-cases/{id}",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Test case ID")
    ),
    responses(
        (status = 200, description = "Test case", body = TestCase),
        (status = 404, description = "Test case not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/test-cases/{id}")]
pub async fn get_test_case(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let test_case = test_case_store::find_by_id(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(test_case))
}

/// Partially update a test case.
#[utoipa::path(
    patch,
    path = "/api/v1/test-cases/{id}",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Test case ID")
    ),
    request_body = UpdateTestCaseRequest,
    responses(
        (status = 200, description = "Updated test case", body = TestCase),
        (status = 400, description = "Resulting test case is invalid", body = crate::error::ErrorResponse),
        (status = 404, description = "Test case not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[patch("/test-cases/{id}")]
pub async fn update_test_case(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTestCaseRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let updated = test_case_store::update(pool.get_ref(), path.into_inner(), actor, &body).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Delete a test case that no run references.
#[utoipa::path(
    delete,
    path = "/api/v1/test-cases/{id}",
    tag = "Test Cases",
    params(
        ("id" = Uuid, Path, description = "Test case ID")
    ),
    responses(
        (status = 204, description = "Test case deleted"),
        (status = 404, description = "Test case not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Referenced by a test run", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[delete("/test-cases/{id}")]
pub async fn delete_test_case(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    auth.require_writer()?;
    test_case_store::delete(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
