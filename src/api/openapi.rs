//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Test Plan Manager Server",
        version = "0.1.0",
        description = "API server for managing test cases, test plans and test run results"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Admin endpoints
        api::admin::create_user,
        api::admin::create_api_key,
        api::admin::revoke_api_key,
        // Project endpoints
        api::projects::create_project,
        api::projects::list_projects,
        api::projects::get_project,
        api::projects::delete_project,
        // Test case endpoints
        api::test_cases::create_test_case,
        api::test_cases::list_project_test_cases,
        api::test_cases::bulk_create_test_cases,
        api::test_cases::bulk_delete_test_cases,
        api::test_cases::import_github_issues,
        api::test_cases::import_rows,
        api::test_cases::delete_project_test_cases,
        api::test_cases::search_test_cases,
        api::test_cases::list_user_test_cases,
        api::test_cases::get_test_case,
        api::test_cases::update_test_case,
        api::test_cases::delete_test_case,
        // Test plan endpoints
        api::test_plans::create_plan,
        api::test_plans::list_plans,
        api::test_plans::get_plan,
        api::test_plans::add_assignments,
        api::test_plans::list_plan_runs,
        api::test_plans::list_plan_testers,
        api::test_plans::set_plan_lock,
        api::test_plans::complete_plan,
        // Test run endpoints
        api::test_runs::get_run,
        api::test_runs::record_result,
        api::test_runs::close_run,
        api::test_runs::issue_invite,
        api::test_runs::revoke_invite,
        // Public endpoints
        api::public::submit_public_result,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::Pagination,
            models::PaginationParams,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Users and keys
            models::UserRole,
            models::User,
            models::CreateUserRequest,
            models::Tester,
            models::CreateApiKeyRequest,
            models::ApiKeyCreateResponse,
            // Projects
            models::Project,
            models::CreateProjectRequest,
            models::ProjectListResponse,
            // Test cases
            models::TestKind,
            models::TestCase,
            models::CreateTestCaseRequest,
            models::UpdateTestCaseRequest,
            models::BulkCreateTestCasesRequest,
            models::BulkCreateResponse,
            models::BulkDeleteRequest,
            models::BulkDeleteResponse,
            models::BulkItemError,
            models::DeleteByProjectResponse,
            models::TestCaseListResponse,
            models::SearchTestCasesQuery,
            api::test_cases::TestCaseCollection,
            services::import::GitHubIssue,
            services::import::GitHubLabel,
            services::import::GitHubImportRequest,
            services::import::RowImportRequest,
            // Test plans
            models::PlannedAssignment,
            models::CreatePlanRequest,
            models::AddAssignmentsRequest,
            models::SetPlanLockRequest,
            models::TestPlan,
            models::AssignmentPair,
            models::AssignmentFailure,
            models::PlanAssignmentOutcome,
            models::TestPlanListResponse,
            models::TesterListResponse,
            // Test runs
            models::ResultState,
            models::SubmissionSource,
            models::Reaction,
            models::TestRun,
            models::TestRunListResponse,
            models::RecordResultRequest,
            models::PublicResultRequest,
            models::IssueInviteRequest,
            models::IssueInviteResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Admin", description = "User and API key bootstrap"),
        (name = "Projects", description = "Projects and their code prefixes"),
        (name = "Test Cases", description = "Test case store, bulk operations and imports"),
        (name = "Test Plans", description = "Plans and their assignment fan-out"),
        (name = "Test Runs", description = "Result submission, closing and invites"),
        (name = "Public", description = "Anonymous submissions through invite tokens")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add API key security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    crate::config::API_KEY_HEADER,
                ))),
            );
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    crate::config::ADMIN_KEY_HEADER,
                ))),
            );
        }
    }
}
