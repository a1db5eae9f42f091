//! Admin bootstrap endpoints: users and their API keys.

use actix_web::{HttpResponse, delete, post, web};
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::db::{DbPool, users};
use crate::error::{AppError, AppResult};
use crate::models::{ApiKeyCreateResponse, CreateApiKeyRequest, CreateUserRequest, User};
use crate::services::api_key;

/// Configure admin routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_user)
        .service(create_api_key)
        .service(revoke_api_key);
}

/// Create a user.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "Admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::error::ErrorResponse),
        (status = 409, description = "Username taken", body = crate::error::ErrorResponse)
    ),
    security(
        ("admin_key" = [])
    )
)]
#[post("/admin/users")]
pub async fn create_user(
    _auth: AdminAuth,
    pool: web::Data<DbPool>,
    body: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    if body.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }

    let user = users::insert_user(pool.connection(), &body)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Username '{}' is already taken", body.username.trim()))
            }
            other => other,
        })?;

    tracing::info!(user_id = %user.id, role = %user.role, "Created user");
    Ok(HttpResponse::Created().json(User::from(user)))
}

/// Create an API key for a user. The full key is only returned here.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/api-keys",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "API key created", body = ApiKeyCreateResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    ),
    security(
        ("admin_key" = [])
    )
)]
#[post("/admin/users/{id}/api-keys")]
pub async fn create_api_key(
    _auth: AdminAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<CreateApiKeyRequest>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let (full_key, key) =
        api_key::create_key(pool.get_ref(), user_id, &body.name, body.expires_in.as_deref())
            .await?;

    Ok(HttpResponse::Created().json(ApiKeyCreateResponse {
        id: key.id,
        user_id: key.user_id,
        key: full_key,
        key_prefix: key.key_prefix,
        name: key.name,
        expires_at: key.expires_at,
        created_at: key.created_at,
    }))
}

/// Revoke an API key.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/api-keys/{id}",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "API key ID")
    ),
    responses(
        (status = 204, description = "API key revoked"),
        (status = 403, description = "Admin access required", body = crate::error::ErrorResponse),
        (status = 404, description = "API key not found or already revoked", body = crate::error::ErrorResponse)
    ),
    security(
        ("admin_key" = [])
    )
)]
#[delete("/admin/api-keys/{id}")]
pub async fn revoke_api_key(
    _auth: AdminAuth,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if !api_key::revoke_key(pool.get_ref(), id).await? {
        return Err(AppError::NotFound(format!("API key {}", id)));
    }
    tracing::info!(key_id = %id, "Revoked API key");
    Ok(HttpResponse::NoContent().finish())
}
