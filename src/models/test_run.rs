//! Test run domain models, result states and reactions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::test_run;
use crate::error::AppError;

/// Result of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultState {
    /// Assigned, no result submitted yet.
    Pending,
    Passed,
    Failed,
}

impl ResultState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for ResultState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who produced the run's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    /// Created by plan fan-out, nothing submitted yet.
    Assignment,
    /// Authenticated user submission.
    User,
    /// Anonymous submission through an invite token.
    PublicInvite,
}

impl SubmissionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::User => "user",
            Self::PublicInvite => "public_invite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assignment" => Some(Self::Assignment),
            "user" => Some(Self::User),
            "public_invite" => Some(Self::PublicInvite),
            _ => None,
        }
    }
}

/// Tester reaction attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reaction {
    Emoji { emoji: String },
    /// 1 (poor) to 5 (great)
    Rating { score: u8 },
}

impl Reaction {
    /// Validate reaction payload bounds.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Reaction::Emoji { emoji } => {
                let len = emoji.chars().count();
                if len == 0 || len > 16 {
                    return Err("emoji reaction must be 1-16 characters".to_string());
                }
            }
            Reaction::Rating { score } => {
                if !(1..=5).contains(score) {
                    return Err(format!("rating must be between 1 and 5, got {}", score));
                }
            }
        }
        Ok(())
    }
}

/// Current reaction envelope version.
pub const REACTION_SCHEMA_VERSION: u16 = 1;

/// Versioned reaction envelope (stored as JSONB).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReaction {
    pub version: u16,
    pub reaction: Reaction,
}

impl StoredReaction {
    pub fn new(reaction: Reaction) -> Self {
        Self {
            version: REACTION_SCHEMA_VERSION,
            reaction,
        }
    }

    pub fn to_json(&self) -> Option<JsonValue> {
        serde_json::to_value(self).ok()
    }

    /// Decode a stored envelope. Envelopes from an unknown schema version are dropped.
    pub fn from_json(value: Option<&JsonValue>) -> Option<Reaction> {
        let stored: StoredReaction = serde_json::from_value(value?.clone()).ok()?;
        if stored.version != REACTION_SCHEMA_VERSION {
            tracing::warn!(
                version = stored.version,
                "Ignoring reaction with unsupported schema version"
            );
            return None;
        }
        Some(stored.reaction)
    }
}

/// Test run as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestRun {
    pub id: Uuid,
    pub project_id: Uuid,
    pub test_plan_id: Uuid,
    pub test_case_id: Uuid,
    pub owner_id: Uuid,
    pub tested_by_id: Uuid,
    pub assigned_to_id: Uuid,
    pub code: String,
    pub external_issue_url: Option<String>,
    pub result_state: ResultState,
    pub is_closed: bool,
    pub notes: Option<String>,
    pub actual_result: Option<String>,
    pub expected_result: Option<String>,
    pub reaction: Option<Reaction>,
    pub tested_on: Option<NaiveDate>,
    pub submission_source: SubmissionSource,
    pub submitted_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<test_run::Model> for TestRun {
    type Error = AppError;

    fn try_from(m: test_run::Model) -> Result<Self, Self::Error> {
        let result_state = ResultState::parse(&m.result_state).ok_or_else(|| {
            AppError::Database(format!(
                "Test run {} has unknown result state '{}'",
                m.id, m.result_state
            ))
        })?;
        let submission_source = SubmissionSource::parse(&m.submission_source).ok_or_else(|| {
            AppError::Database(format!(
                "Test run {} has unknown submission source '{}'",
                m.id, m.submission_source
            ))
        })?;

        Ok(Self {
            reaction: StoredReaction::from_json(m.reaction.as_ref()),
            id: m.id,
            project_id: m.project_id,
            test_plan_id: m.test_plan_id,
            test_case_id: m.test_case_id,
            owner_id: m.owner_id,
            tested_by_id: m.tested_by_id,
            assigned_to_id: m.assigned_to_id,
            code: m.code,
            external_issue_url: m.external_issue_url,
            result_state,
            is_closed: m.is_closed,
            notes: m.notes,
            actual_result: m.actual_result,
            expected_result: m.expected_result,
            tested_on: m.tested_on,
            submission_source,
            submitted_by_id: m.submitted_by_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// Authenticated result submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordResultRequest {
    /// `passed` or `failed`
    pub result_state: ResultState,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub actual_result: Option<String>,
    #[serde(default)]
    pub expected_result: Option<String>,
    /// Defaults to today (UTC)
    #[serde(default)]
    pub tested_on: Option<NaiveDate>,
    #[serde(default)]
    pub reaction: Option<Reaction>,
    #[serde(default)]
    pub external_issue_url: Option<String>,
    /// Close the run in the same transition; closed runs accept no further results
    #[serde(default)]
    pub close: bool,
}

impl RecordResultRequest {
    /// A bare result without annotations.
    pub fn with_state(result_state: ResultState) -> Self {
        Self {
            result_state,
            notes: None,
            actual_result: None,
            expected_result: None,
            tested_on: None,
            reaction: None,
            external_issue_url: None,
            close: false,
        }
    }
}

/// Anonymous result submission through an invite token.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PublicResultRequest {
    pub token: String,
    pub result_state: ResultState,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request to issue a public invite for a run.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IssueInviteRequest {
    /// Lifetime in hours; server default when absent
    #[serde(default)]
    pub expires_in_hours: Option<i64>,
}

/// Issued invite. The token is only returned once.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueInviteResponse {
    pub invite_id: Uuid,
    pub token: String,
    pub test_case_id: Uuid,
    pub test_run_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Run list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestRunListResponse {
    pub test_runs: Vec<TestRun>,
}
