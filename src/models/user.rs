//! User and tester models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::user;

/// User roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Member,
    /// Read-only; cannot create plans or submit results
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            role: UserRole::parse(&m.role).unwrap_or_default(),
            username: m.username,
            display_name: m.display_name,
            last_login_at: m.last_login_at,
            created_at: m.created_at,
        }
    }
}

/// Request to create a user (admin bootstrap).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// A user seen through the plans they are assigned to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Tester {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Runs assigned to this tester in the plan
    pub assigned_runs: u64,
}

impl Tester {
    pub fn from_user(m: user::Model, assigned_runs: u64) -> Self {
        let display_name = m.display_name.clone().unwrap_or_else(|| m.username.clone());
        Self {
            user_id: m.id,
            role: UserRole::parse(&m.role).unwrap_or_default(),
            username: m.username,
            display_name,
            last_login_at: m.last_login_at,
            assigned_runs,
        }
    }
}
