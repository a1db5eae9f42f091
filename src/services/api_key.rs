//! API key generation and verification.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{DbPool, api_keys as db, users};
use crate::error::{AppError, AppResult};
use crate::models::{ApiKey, AuthenticatedCaller};

/// API key prefix.
const KEY_PREFIX: &str = "tpm_";
/// Length of the key prefix stored for identification.
const KEY_PREFIX_LENGTH: usize = 8;

/// Generate a new random API key for a user.
///
/// Returns the full key (to be shown once) and the key data for storage.
pub fn generate_key(
    user_id: Uuid,
    name: &str,
    expires_in: Option<&str>,
) -> AppResult<(String, ApiKey)> {
    let full_key = format!("{}{}", KEY_PREFIX, Uuid::new_v4().simple());
    let key_hash = hash_key(&full_key);
    let key_prefix = full_key.chars().take(KEY_PREFIX_LENGTH).collect::<String>();

    let expires_at = match expires_in {
        Some(raw) => Some(
            Utc::now()
                + parse_duration(raw).ok_or_else(|| {
                    AppError::Validation(format!("Invalid expiration duration: {}", raw))
                })?,
        ),
        None => None,
    };

    let api_key = ApiKey {
        id: Uuid::now_v7(),
        user_id,
        key_hash,
        key_prefix,
        name: name.to_string(),
        expires_at,
        last_used_at: None,
        created_at: Utc::now(),
        deleted_at: None,
    };

    Ok((full_key, api_key))
}

/// Hash an API key using SHA-256.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a duration string like "365d", "30d", "1y", "6m", "2w".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(days) = s.strip_suffix('d') {
        days.parse::<i64>().ok().and_then(Duration::try_days)
    } else if let Some(years) = s.strip_suffix('y') {
        years
            .parse::<i64>()
            .ok()
            .and_then(|y| Duration::try_days(y * 365))
    } else if let Some(months) = s.strip_suffix('m') {
        months
            .parse::<i64>()
            .ok()
            .and_then(|m| Duration::try_days(m * 30))
    } else if let Some(weeks) = s.strip_suffix('w') {
        weeks.parse::<i64>().ok().and_then(Duration::try_weeks)
    } else {
        s.parse::<i64>().ok().and_then(Duration::try_days)
    }
}

/// Verify an API key and return the user it authenticates.
pub async fn verify_key(pool: &DbPool, key: &str) -> AppResult<AuthenticatedCaller> {
    let conn = pool.connection();

    let api_key = db::find_by_hash(conn, &hash_key(key))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

    if api_key.is_revoked() {
        return Err(AppError::Unauthorized(
            "API key has been revoked".to_string(),
        ));
    }

    if api_key.is_expired() {
        return Err(AppError::Unauthorized("API key has expired".to_string()));
    }

    let user = users::find_by_id(conn, api_key.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("API key owner no longer exists".to_string()))?;

    // Bookkeeping only; a failure here must not reject the request
    if let Err(e) = db::update_last_used(conn, api_key.id).await {
        tracing::warn!(key_prefix = %api_key.key_prefix, "Failed to record API key use: {}", e);
    }
    if let Err(e) = users::touch_last_login(conn, user.id).await {
        tracing::warn!(user_id = %user.id, "Failed to record last login: {}", e);
    }

    Ok(AuthenticatedCaller {
        user_id: Some(user.id),
        role: users::role_of(&user),
        display_name: user.display_name.unwrap_or(user.username),
    })
}

/// Create a new API key for an existing user and store it.
pub async fn create_key(
    pool: &DbPool,
    user_id: Uuid,
    name: &str,
    expires_in: Option<&str>,
) -> AppResult<(String, ApiKey)> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("API key name is required".to_string()));
    }

    users::find_by_id(pool.connection(), user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

    let (full_key, api_key) = generate_key(user_id, name.trim(), expires_in)?;
    db::insert_api_key(pool.connection(), &api_key).await?;

    tracing::info!(user_id = %user_id, key_prefix = %api_key.key_prefix, "Created API key");

    Ok((full_key, api_key))
}

/// Revoke an API key by ID.
pub async fn revoke_key(pool: &DbPool, id: Uuid) -> AppResult<bool> {
    db::revoke(pool.connection(), id).await
}
