//! Test case domain models and DTOs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Pagination;
use crate::entity::test_case;
use crate::error::AppError;

/// Kind of testing a test case or plan belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    General,
    Adhoc,
    Triage,
    Integration,
    UserAcceptance,
    Regression,
    Security,
    UserInterface,
    Scenario,
}

impl TestKind {
    pub const ALL: [TestKind; 9] = [
        Self::General,
        Self::Adhoc,
        Self::Triage,
        Self::Integration,
        Self::UserAcceptance,
        Self::Regression,
        Self::Security,
        Self::UserInterface,
        Self::Scenario,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Adhoc => "adhoc",
            Self::Triage => "triage",
            Self::Integration => "integration",
            Self::UserAcceptance => "user_acceptance",
            Self::Regression => "regression",
            Self::Security => "security",
            Self::UserInterface => "user_interface",
            Self::Scenario => "scenario",
        }
    }

    /// Parse a kind, tolerating case and `-`/space separators from spreadsheets.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Test case as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestCase {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: TestKind,
    pub code: String,
    pub feature: Option<String>,
    pub title: String,
    pub description: String,
    pub is_draft: bool,
    /// Sorted, unique
    pub tags: Vec<String>,
    pub parent_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<test_case::Model> for TestCase {
    type Error = AppError;

    fn try_from(m: test_case::Model) -> Result<Self, Self::Error> {
        let kind = TestKind::parse(&m.kind).ok_or_else(|| {
            AppError::Database(format!("Test case {} has unknown kind '{}'", m.id, m.kind))
        })?;
        let tags: BTreeSet<String> = serde_json::from_value(m.tags).map_err(|e| {
            AppError::Database(format!("Test case {} has malformed tags: {}", m.id, e))
        })?;

        Ok(Self {
            id: m.id,
            project_id: m.project_id,
            kind,
            code: m.code,
            feature: m.feature,
            title: m.title,
            description: m.description,
            is_draft: m.is_draft,
            tags: tags.into_iter().collect(),
            parent_id: m.parent_id,
            created_by_id: m.created_by_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// Request to create a test case.
///
/// Fields are kept loosely typed so that a malformed row in a bulk import
/// surfaces as a per-item validation error instead of failing the batch.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateTestCaseRequest {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Partial update of a test case.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTestCaseRequest {
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub feature: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_draft: Option<bool>,
    pub parent_id: Option<Uuid>,
    /// Detach from the current parent; ignored when `parent_id` is given
    #[serde(default)]
    pub clear_parent: bool,
}

/// Per-item failure inside a bulk operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkItemError {
    /// Position of the item in the request
    pub index: usize,
    /// Machine-readable error code
    pub error: String,
    pub message: String,
}

impl BulkItemError {
    pub fn new(index: usize, err: &AppError) -> Self {
        Self {
            index,
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Bulk creation request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkCreateTestCasesRequest {
    pub test_cases: Vec<CreateTestCaseRequest>,
}

/// Bulk creation result: successes and failures together.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BulkCreateResponse {
    pub created: Vec<TestCase>,
    pub errors: Vec<BulkItemError>,
    /// True when the operation stopped early; items after the last reported index were not attempted
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

/// Bulk deletion request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// Bulk deletion result.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BulkDeleteResponse {
    pub deleted: Vec<Uuid>,
    pub errors: Vec<BulkItemError>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

/// Response for deleting every test case of a project.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteByProjectResponse {
    pub project_id: Uuid,
    pub deleted: u64,
}

/// Paginated test cases.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestCaseListResponse {
    pub test_cases: Vec<TestCase>,
    pub pagination: Pagination,
}

/// Query parameters for keyword search.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchTestCasesQuery {
    /// Matched against title and code, case-insensitively
    pub q: String,
    pub project_id: Option<Uuid>,
    /// Maximum results (default 50, max 200)
    pub limit: Option<u64>,
}
