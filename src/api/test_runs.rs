//! Test run API handlers: results, closing and public invites.

use actix_web::{HttpResponse, delete, get, post, web};
use uuid::Uuid;

use crate::auth::ApiKeyAuth;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{IssueInviteRequest, IssueInviteResponse, RecordResultRequest, TestRun};
use crate::services::{invites, run_state};

/// Configure test run routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_run)
        .service(record_result)
        .service(close_run)
        .service(issue_invite)
        .service(revoke_invite);
}

/// Get a run.
#[utoipa::path(
    get,
    path = "/api/v1/test-runs/{id}",
    tag = "Test Runs",
    params(
        ("id" = Uuid, Path, description = "Test run ID")
    ),
    responses(
        (status = 200, description = "Run", body = TestRun),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/test-runs/{id}")]
pub async fn get_run(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let run = run_state::get_run(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(run))
}

/// Submit a result for a run. Resubmission overwrites the previous result.
#[utoipa::path(
    post,
    path = "/api/v1/test-runs/{id}/results",
    tag = "Test Runs",
    params(
        ("id" = Uuid, Path, description = "Test run ID")
    ),
    request_body = RecordResultRequest,
    responses(
        (status = 200, description = "Updated run", body = TestRun),
        (status = 400, description = "Invalid result", body = crate::error::ErrorResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Run is closed", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/test-runs/{id}/results")]
pub async fn record_result(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<RecordResultRequest>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let run = run_state::record_result(pool.get_ref(), path.into_inner(), actor, &body).await?;
    Ok(HttpResponse::Ok().json(run))
}

/// Close a run. Closed runs accept no further results.
#[utoipa::path(
    post,
    path = "/api/v1/test-runs/{id}/close",
    tag = "Test Runs",
    params(
        ("id" = Uuid, Path, description = "Test run ID")
    ),
    responses(
        (status = 200, description = "Closed run", body = TestRun),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/test-runs/{id}/close")]
pub async fn close_run(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let run = run_state::close_run(pool.get_ref(), path.into_inner(), actor).await?;
    Ok(HttpResponse::Ok().json(run))
}

/// Issue a public invite token for a run. The token is shown only in this response.
#[utoipa::path(
    post,
    path = "/api/v1/test-runs/{id}/invites",
    tag = "Test Runs",
    params(
        ("id" = Uuid, Path, description = "Test run ID")
    ),
    request_body = IssueInviteRequest,
    responses(
        (status = 201, description = "Invite issued", body = IssueInviteResponse),
        (status = 400, description = "Invalid lifetime", body = crate::error::ErrorResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Run is closed", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/test-runs/{id}/invites")]
pub async fn issue_invite(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    body: Option<web::Json<IssueInviteRequest>>,
) -> AppResult<HttpResponse> {
    let actor = auth.require_writer()?;
    let ttl_hours = body.and_then(|b| b.into_inner().expires_in_hours);

    let invite = invites::issue_invite(
        pool.get_ref(),
        &config.workflow,
        path.into_inner(),
        actor,
        ttl_hours,
    )
    .await?;
    Ok(HttpResponse::Created().json(invite))
}

/// Revoke a public invite.
#[utoipa::path(
    delete,
    path = "/api/v1/invites/{id}",
    tag = "Test Runs",
    params(
        ("id" = Uuid, Path, description = "Invite ID")
    ),
    responses(
        (status = 204, description = "Invite revoked"),
        (status = 404, description = "No active invite with this ID", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[delete("/invites/{id}")]
pub async fn revoke_invite(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    auth.require_writer()?;
    invites::revoke_invite(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
