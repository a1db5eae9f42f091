//! Test plan models and assignment outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::test_case::TestKind;
use super::test_run::TestRun;
use crate::entity::test_plan;
use crate::error::AppError;

/// One test case and the testers it should be assigned to.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlannedAssignment {
    pub test_case_id: Uuid,
    pub user_ids: Vec<Uuid>,
}

impl PlannedAssignment {
    pub fn new(test_case_id: Uuid, user_ids: Vec<Uuid>) -> Self {
        Self {
            test_case_id,
            user_ids,
        }
    }
}

/// Expand planned assignments into (test case, user) pairs, preserving request order.
pub fn expand_pairs(assignments: &[PlannedAssignment]) -> Vec<AssignmentPair> {
    assignments
        .iter()
        .flat_map(|a| {
            a.user_ids.iter().map(move |user_id| AssignmentPair {
                test_case_id: a.test_case_id,
                user_id: *user_id,
            })
        })
        .collect()
}

/// Request to create a test plan and fan out its runs.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    pub kind: TestKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to_id: Option<Uuid>,
    #[serde(default)]
    pub assignments: Vec<PlannedAssignment>,
}

/// Request to add assignments to an existing plan.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddAssignmentsRequest {
    pub assignments: Vec<PlannedAssignment>,
}

/// Request to lock or unlock a plan.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetPlanLockRequest {
    pub locked: bool,
}

/// Test plan as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestPlan {
    pub id: Uuid,
    pub project_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub updated_by_id: Uuid,
    pub kind: TestKind,
    pub description: String,
    pub start_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub scheduled_end_at: Option<DateTime<Utc>>,
    /// Distinct test cases across the plan's runs
    pub num_test_cases: i32,
    /// Runs currently failed
    pub num_failures: i32,
    pub is_complete: bool,
    pub is_locked: bool,
    pub has_report: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<test_plan::Model> for TestPlan {
    type Error = AppError;

    fn try_from(m: test_plan::Model) -> Result<Self, Self::Error> {
        let kind = TestKind::parse(&m.kind).ok_or_else(|| {
            AppError::Database(format!("Test plan {} has unknown kind '{}'", m.id, m.kind))
        })?;

        Ok(Self {
            id: m.id,
            project_id: m.project_id,
            assigned_to_id: m.assigned_to_id,
            created_by_id: m.created_by_id,
            updated_by_id: m.updated_by_id,
            kind,
            description: m.description,
            start_at: m.start_at,
            closed_at: m.closed_at,
            scheduled_end_at: m.scheduled_end_at,
            num_test_cases: m.num_test_cases,
            num_failures: m.num_failures,
            is_complete: m.is_complete,
            is_locked: m.is_locked,
            has_report: m.has_report,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// A single (test case, tester) pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct AssignmentPair {
    pub test_case_id: Uuid,
    pub user_id: Uuid,
}

/// A pairing that could not be assigned.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentFailure {
    pub test_case_id: Uuid,
    pub user_id: Uuid,
    /// Machine-readable error code
    pub error: String,
    pub message: String,
}

impl AssignmentFailure {
    pub fn new(pair: AssignmentPair, err: &AppError) -> Self {
        Self {
            test_case_id: pair.test_case_id,
            user_id: pair.user_id,
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of a plan fan-out: created runs, skipped pairs and failed pairs.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanAssignmentOutcome {
    /// Plan state after the fan-out
    pub plan: TestPlan,
    pub created: Vec<TestRun>,
    /// Pairs that already had a run in this plan
    pub skipped: Vec<AssignmentPair>,
    pub failed: Vec<AssignmentFailure>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

/// Plan list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestPlanListResponse {
    pub test_plans: Vec<TestPlan>,
}

/// Testers assigned in a plan.
#[derive(Debug, Serialize, ToSchema)]
pub struct TesterListResponse {
    pub testers: Vec<super::user::Tester>,
}
