//! Actix-web extractors for API key authentication.
//!
//! # Security
//! - Header secrets are wrapped in `SecretString` as soon as they are read
//! - Secret values are never logged or exposed in debug output
//! - The admin key is compared in constant time

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use futures_util::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use super::AdminKey;
use crate::config::{ADMIN_KEY_HEADER, API_KEY_HEADER};
use crate::db::DbPool;
use crate::error::{AppError, ErrorResponse};
use crate::models::{AuthenticatedCaller, UserRole};
use crate::services::api_key;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    status: StatusCode,
    message: String,
}

impl AuthError {
    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        let error = if self.status == StatusCode::FORBIDDEN {
            "FORBIDDEN"
        } else {
            "UNAUTHORIZED"
        };
        HttpResponse::build(self.status).json(ErrorResponse {
            error: error.to_string(),
            message: self.message.clone(),
        })
    }
}

/// Resolve the caller from the admin key or an API key.
fn authenticate(req: &HttpRequest) -> LocalBoxFuture<'static, Result<AuthenticatedCaller, AuthError>> {
    let pool = req.app_data::<web::Data<DbPool>>().cloned();
    let stored_admin_key = req.app_data::<web::Data<AdminKey>>().cloned();
    let provided_api_key = extract_secret_header(req, API_KEY_HEADER);
    let provided_admin_key = extract_secret_header(req, ADMIN_KEY_HEADER);

    Box::pin(async move {
        let pool = pool.ok_or_else(|| AuthError::unauthorized("Internal configuration error"))?;

        // Admin key first, for bootstrap operations
        if let (Some(provided), Some(stored)) = (&provided_admin_key, &stored_admin_key)
            && stored.verify(provided.expose_secret())
        {
            return Ok(AuthenticatedCaller {
                user_id: None,
                display_name: "Admin (Bootstrap)".to_string(),
                role: UserRole::Admin,
            });
        }

        let key = provided_api_key
            .ok_or_else(|| AuthError::unauthorized("Missing API key. Provide X-API-Key header."))?;

        api_key::verify_key(pool.get_ref(), key.expose_secret())
            .await
            .map_err(|e| match e {
                AppError::Unauthorized(message) => AuthError::unauthorized(message),
                other => {
                    tracing::error!("API key verification failed: {}", other);
                    AuthError::unauthorized("Could not verify API key")
                }
            })
    })
}

/// Extractor that requires a valid API key (or the admin key).
///
/// ```ignore
/// async fn protected_handler(auth: ApiKeyAuth) -> impl Responder {
///     // auth.caller contains the authenticated caller info
/// }
/// ```
pub struct ApiKeyAuth {
    pub caller: AuthenticatedCaller,
}

impl ApiKeyAuth {
    /// The acting user. The bootstrap admin key has none, so it cannot author records.
    pub fn require_user(&self) -> Result<Uuid, AppError> {
        self.caller.user_id.ok_or_else(|| {
            AppError::Unauthorized(
                "This operation needs a user API key; the admin key has no user".to_string(),
            )
        })
    }

    /// The acting user, who must be allowed to write.
    pub fn require_writer(&self) -> Result<Uuid, AppError> {
        let user_id = self.require_user()?;
        if !self.caller.can_write() {
            return Err(AppError::Unauthorized(format!(
                "Role '{}' is read-only",
                self.caller.role
            )));
        }
        Ok(user_id)
    }
}

impl FromRequest for ApiKeyAuth {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let fut = authenticate(req);
        Box::pin(async move { fut.await.map(|caller| ApiKeyAuth { caller }) })
    }
}

/// Extractor that requires an administrator: the admin key or an admin user's API key.
pub struct AdminAuth {
    pub caller: AuthenticatedCaller,
}

impl FromRequest for AdminAuth {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let fut = authenticate(req);
        Box::pin(async move {
            let caller = fut.await?;
            if !caller.is_admin() {
                return Err(AuthError::forbidden("Admin access required"));
            }
            Ok(AdminAuth { caller })
        })
    }
}
