//! Domain models for the test plan manager.

use utoipa::ToSchema;

pub mod api_key;
pub mod project;
pub mod test_case;
pub mod test_plan;
pub mod test_run;
pub mod user;

// Re-export commonly used types
pub use api_key::{ApiKey, ApiKeyCreateResponse, AuthenticatedCaller, CreateApiKeyRequest};
pub use project::{CreateProjectRequest, Project, ProjectListResponse};
pub use test_case::{
    BulkCreateResponse, BulkCreateTestCasesRequest, BulkDeleteRequest, BulkDeleteResponse,
    BulkItemError, CreateTestCaseRequest, DeleteByProjectResponse, SearchTestCasesQuery, TestCase,
    TestCaseListResponse, TestKind, UpdateTestCaseRequest,
};
pub use test_plan::{
    AddAssignmentsRequest, AssignmentFailure, AssignmentPair, CreatePlanRequest,
    PlanAssignmentOutcome, PlannedAssignment, SetPlanLockRequest, TestPlan, TestPlanListResponse,
    TesterListResponse,
};
pub use test_run::{
    IssueInviteRequest, IssueInviteResponse, PublicResultRequest, Reaction, RecordResultRequest,
    ResultState, StoredReaction, SubmissionSource, TestRun, TestRunListResponse,
};
pub use user::{CreateUserRequest, Tester, User, UserRole};

/// Pagination parameters.
#[derive(Debug, Clone, Default, serde::Deserialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    50
}

impl PaginationParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(default_page()).max(1)
    }

    /// Calculate the offset for database queries.
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.clamped_limit()
    }

    /// Clamp limit to maximum allowed value.
    pub fn clamped_limit(&self) -> u32 {
        self.limit.unwrap_or(default_limit()).clamp(1, 200)
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(limit.max(1) as u64) as u32
        };

        Pagination {
            page,
            limit,
            total,
            total_pages,
        }
    }
}
