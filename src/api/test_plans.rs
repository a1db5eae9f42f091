//! Test plan API handlers.

use std::time::Duration;

use actix_web::{HttpResponse, get, post, web};
use uuid::Uuid;

use crate::auth::ApiKeyAuth;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{
    AddAssignmentsRequest, CreatePlanRequest, PlanAssignmentOutcome, SetPlanLockRequest, TestPlan,
    TestPlanListResponse, TestRunListResponse, TesterListResponse,
};
use crate::services::{CancelSignal, plan_builder};

/// Configure test plan routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_plan)
        .service(list_plans)
        .service(get_plan)
        .service(add_assignments)
        .service(list_plan_runs)
        .service(list_plan_testers)
        .service(set_plan_lock)
        .service(complete_plan);
}

/// Create a test plan and one run per (test case, tester) pair.
///
/// Responds 201 even when some pairs failed; inspect `failed` in the body.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/test-plans",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = CreatePlanRequest,
    responses(
        (status = 201, description = "Plan created", body = PlanAssignmentOutcome),
        (status = 400, description = "Invalid plan", body = crate::error::ErrorResponse),
        (status = 404, description = "Project or assignee not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/projects/{id}/test-plans")]
pub async fn create_plan(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<CreatePlanRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;

    let cancel = CancelSignal::new();
    let _deadline = cancel.with_deadline(Duration::from_secs(config.workflow.bulk_deadline_secs));

    let outcome = plan_builder::create_plan(
        pool.get_ref(),
        &config.workflow,
        path.into_inner(),
        actor,
        &body,
        &cancel,
    )
    .await?;
    Ok(HttpResponse::Created().json(outcome))
}

/// List a project's plans.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/test-plans",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Plans", body = TestPlanListResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/projects/{id}/test-plans")]
pub async fn list_plans(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let test_plans = plan_builder::list_plans(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TestPlanListResponse { test_plans }))
}

/// Get a plan.
#[utoipa::path(
    get,
    path = "/api/v1/test-plans/{id}",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Test plan ID")
    ),
    responses(
        (status = 200, description = "Plan", body = TestPlan),
        (status = 404, description = "Plan not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/test-plans/{id}")]
pub async fn get_plan(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let plan = plan_builder::get_plan(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(plan))
}

/// Add assignments to an open plan. Pairs that already have a run are skipped.
#[utoipa::path(
    post,
    path = "/api/v1/test-plans/{id}/assignments",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Test plan ID")
    ),
    request_body = AddAssignmentsRequest,
    responses(
        (status = 200, description = "Created, skipped and failed pairs", body = PlanAssignmentOutcome),
        (status = 404, description = "Plan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Plan is locked or complete", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/test-plans/{id}/assignments")]
pub async fn add_assignments(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: web::Json<AddAssignmentsRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;

    let cancel = CancelSignal::new();
    let _deadline = cancel.with_deadline(Duration::from_secs(config.workflow.bulk_deadline_secs));

    let outcome = plan_builder::add_assignments(
        pool.get_ref(),
        &config.workflow,
        path.into_inner(),
        actor,
        &body,
        &cancel,
    )
    .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Runs of a plan.
#[utoipa::path(
    get,
    path = "/api/v1/test-plans/{id}/runs",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Test plan ID")
    ),
    responses(
        (status = 200, description = "Runs", body = TestRunListResponse),
        (status = 404, description = "Plan not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/test-plans/{id}/runs")]
pub async fn list_plan_runs(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let test_runs = plan_builder::list_plan_runs(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TestRunListResponse { test_runs }))
}

/// Testers assigned in a plan.
#[utoipa::path(
    get,
    path = "/api/v1/test-plans/{id}/testers",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Test plan ID")
    ),
    responses(
        (status = 200, description = "Testers", body = TesterListResponse),
        (status = 404, description = "Plan not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/test-plans/{id}/testers")]
pub async fn list_plan_testers(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let testers = plan_builder::list_plan_testers(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TesterListResponse { testers }))
}

/// Lock or unlock a plan.
#[utoipa::path(
    post,
    path = "/api/v1/test-plans/{id}/lock",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Test plan ID")
    ),
    request_body = SetPlanLockRequest,
    responses(
        (status = 200, description = "Plan", body = TestPlan),
        (status = 404, description = "Plan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Complete plans cannot be unlocked", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/test-plans/{id}/lock")]
pub async fn set_plan_lock(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<SetPlanLockRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let plan =
        plan_builder::set_plan_lock(pool.get_ref(), path.into_inner(), actor, body.locked).await?;
    Ok(HttpResponse::Ok().json(plan))
}

/// Mark a plan complete. It is locked as well.
#[utoipa::path(
    post,
    path = "/api/v1/test-plans/{id}/complete",
    tag = "Test Plans",
    params(
        ("id" = Uuid, Path, description = "Test plan ID")
    ),
    responses(
        (status = 200, description = "Plan", body = TestPlan),
        (status = 404, description = "Plan not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/test-plans/{id}/complete")]
pub async fn complete_plan(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let plan = plan_builder::complete_plan(pool.get_ref(), path.into_inner(), actor).await?;
    Ok(HttpResponse::Ok().json(plan))
}
