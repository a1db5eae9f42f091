//! Project models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::project;

/// Project as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    /// Prefix of test case and test run codes
    pub code: String,
    pub owner_id: Uuid,
    pub is_active: bool,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<project::Model> for Project {
    fn from(m: project::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            code: m.code,
            owner_id: m.owner_id,
            is_active: m.is_active,
            is_public: m.is_public,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Request to create a project.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub title: String,
    /// 2-10 uppercase letters or digits, starting with a letter
    pub code: String,
    #[serde(default)]
    pub is_public: bool,
}

/// Project list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}
