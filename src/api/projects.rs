//! Project API handlers.

use actix_web::{HttpResponse, delete, get, post, web};
use uuid::Uuid;

use crate::auth::ApiKeyAuth;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CreateProjectRequest, Project, ProjectListResponse};
use crate::services::projects;

/// Configure project routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_project)
        .service(list_projects)
        .service(get_project)
        .service(delete_project);
}

/// Create a project owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Invalid title or code", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 409, description = "Code already taken", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/projects")]
pub async fn create_project(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    body: web::Json<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    let owner = auth.require_writer()?;
    let project = projects::create_project(pool.get_ref(), owner, &body).await?;
    Ok(HttpResponse::Created().json(project))
}

/// List live projects.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    responses(
        (status = 200, description = "Projects", body = ProjectListResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/projects")]
pub async fn list_projects(_auth: ApiKeyAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let projects = projects::list_projects(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ProjectListResponse { projects }))
}

/// Get a project.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project", body = Project),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/projects/{id}")]
pub async fn get_project(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = projects::get_project(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Soft-delete a project. Only its owner or an admin may do this.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("api_key" = [])
    )
)]
#[delete("/projects/{id}")]
pub async fn delete_project(
    auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let project = projects::get_project(pool.get_ref(), id).await?;

    if !auth.caller.is_admin() && auth.caller.user_id != Some(project.owner_id) {
        return Err(AppError::Unauthorized(
            "Only the project owner can delete it".to_string(),
        ));
    }

    projects::delete_project(pool.get_ref(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}
