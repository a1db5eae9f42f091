//! Public invite tokens for unauthenticated result submission.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::db::{DbPool, invites as db, test_runs};
use crate::entity::test_run_invite;
use crate::error::{AppError, AppResult};
use crate::models::IssueInviteResponse;

/// Invite token prefix.
const TOKEN_PREFIX: &str = "tpi_";

/// What an invite token grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteTarget {
    pub invite_id: Uuid,
    pub test_case_id: Uuid,
    pub test_run_id: Uuid,
}

impl From<test_run_invite::Model> for InviteTarget {
    fn from(m: test_run_invite::Model) -> Self {
        Self {
            invite_id: m.id,
            test_case_id: m.test_case_id,
            test_run_id: m.test_run_id,
        }
    }
}

/// Resolves opaque invite tokens.
///
/// Unknown, revoked and expired tokens all fail with `InvalidToken`, so a
/// caller cannot tell them apart.
#[async_trait::async_trait]
pub trait InviteResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> AppResult<InviteTarget>;
}

/// Generate a fresh token: prefix plus 64 hex chars from two random UUIDs.
pub fn generate_token() -> String {
    format!(
        "{}{}{}",
        TOKEN_PREFIX,
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Hash a token using SHA-256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// Issue an invite for a run. The token is returned once and never stored.
pub async fn issue_invite(
    pool: &DbPool,
    workflow: &WorkflowConfig,
    run_id: Uuid,
    actor: Uuid,
    ttl_hours: Option<i64>,
) -> AppResult<IssueInviteResponse> {
    let ttl_hours = ttl_hours.unwrap_or(workflow.invite_ttl_hours);
    let ttl = Duration::try_hours(ttl_hours)
        .filter(|d| *d > Duration::zero())
        .ok_or_else(|| AppError::Validation(format!("Invalid invite lifetime: {}h", ttl_hours)))?;

    let run = test_runs::find_run(pool.connection(), run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test run {}", run_id)))?;

    if run.is_closed {
        return Err(AppError::RunClosed(run.code));
    }

    let token = generate_token();
    let expires_at = Utc::now() + ttl;
    let invite = db::insert_invite(
        pool.connection(),
        hash_token(&token),
        run.test_case_id,
        run.id,
        actor,
        expires_at,
    )
    .await?;

    tracing::info!(
        invite_id = %invite.id,
        run_id = %run.id,
        expires_at = %expires_at,
        "Issued public invite"
    );

    Ok(IssueInviteResponse {
        invite_id: invite.id,
        token,
        test_case_id: invite.test_case_id,
        test_run_id: invite.test_run_id,
        expires_at: invite.expires_at,
    })
}

/// Revoke an invite by ID.
pub async fn revoke_invite(pool: &DbPool, invite_id: Uuid) -> AppResult<()> {
    if !db::revoke(pool.connection(), invite_id).await? {
        return Err(AppError::NotFound(format!("Active invite {}", invite_id)));
    }
    tracing::info!(invite_id = %invite_id, "Revoked public invite");
    Ok(())
}
