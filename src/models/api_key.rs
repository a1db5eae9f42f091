//! API key models for authentication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserRole;

/// API Key stored in database.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: Uuid,
    /// Owner of the key; every request made with it acts as this user
    pub user_id: Uuid,
    /// SHA-256 hash of the full key
    pub key_hash: String,
    /// First 8 characters of the key for identification
    pub key_prefix: String,
    /// Human-readable name (e.g., "CI - nightly import")
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Soft delete timestamp (revoked)
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_revoked(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            Utc::now() > expires_at
        } else {
            false
        }
    }
}

impl From<crate::entity::api_key::Model> for ApiKey {
    fn from(m: crate::entity::api_key::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            key_hash: m.key_hash,
            key_prefix: m.key_prefix,
            name: m.name,
            expires_at: m.expires_at,
            last_used_at: m.last_used_at,
            created_at: m.created_at,
            deleted_at: m.deleted_at,
        }
    }
}

/// Response when creating a new API key (includes the full key).
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyCreateResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Full key - only shown once
    pub key: String,
    pub key_prefix: String,
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request to create a new API key.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    pub name: String,
    /// Expiration duration (e.g., "365d", "30d", "1y")
    #[serde(default)]
    pub expires_in: Option<String>,
}

/// Authenticated caller resolved from an API key or the admin key.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    /// None for the bootstrap admin key, which is not tied to a user
    pub user_id: Option<Uuid>,
    pub display_name: String,
    pub role: UserRole,
}

impl AuthenticatedCaller {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    pub fn can_write(&self) -> bool {
        !matches!(self.role, UserRole::Viewer)
    }
}
