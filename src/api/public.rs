//! Unauthenticated endpoints. The invite token is the only credential.

use actix_web::{HttpResponse, post, web};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::PublicResultRequest;
use crate::services::run_state;

/// Configure public routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(submit_public_result);
}

/// Submit a result through an invite token.
#[utoipa::path(
    post,
    path = "/api/v1/public/results",
    tag = "Public",
    request_body = PublicResultRequest,
    responses(
        (status = 204, description = "Result recorded"),
        (status = 400, description = "Invalid result", body = crate::error::ErrorResponse),
        (status = 403, description = "Unknown, revoked or expired token", body = crate::error::ErrorResponse),
        (status = 409, description = "Run is closed", body = crate::error::ErrorResponse)
    )
)]
#[post("/public/results")]
pub async fn submit_public_result(
    pool: web::Data<DbPool>,
    body: web::Json<PublicResultRequest>,
) -> AppResult<HttpResponse> {
    run_state::record_public_result(pool.get_ref(), pool.get_ref(), &body).await?;
    Ok(HttpResponse::NoContent().finish())
}
