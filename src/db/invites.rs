//! Database operations for public invite tokens.

use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::test_run_invite;
use crate::error::{AppError, AppResult};
use crate::services::invites::{InviteResolver, InviteTarget, hash_token};

use super::DbPool;

/// Insert a new invite.
pub async fn insert_invite(
    db: &DatabaseConnection,
    token_hash: String,
    test_case_id: Uuid,
    test_run_id: Uuid,
    created_by_id: Uuid,
    expires_at: DateTime<Utc>,
) -> AppResult<test_run_invite::Model> {
    let model = test_run_invite::ActiveModel {
        id: Set(Uuid::now_v7()),
        token_hash: Set(token_hash),
        test_case_id: Set(test_case_id),
        test_run_id: Set(test_run_id),
        created_by_id: Set(created_by_id),
        expires_at: Set(expires_at),
        revoked_at: Set(None),
        created_at: Set(Utc::now()),
    };

    Ok(model.insert(db).await?)
}

/// Find an invite that is neither revoked nor expired at `now`.
pub async fn find_active_by_hash<C: ConnectionTrait>(
    db: &C,
    token_hash: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<test_run_invite::Model>> {
    let result = test_run_invite::Entity::find()
        .filter(test_run_invite::Column::TokenHash.eq(token_hash))
        .filter(test_run_invite::Column::RevokedAt.is_null())
        .filter(test_run_invite::Column::ExpiresAt.gt(now))
        .one(db)
        .await?;

    Ok(result)
}

/// Revoke an invite. Returns false if unknown or already revoked.
pub async fn revoke(db: &DatabaseConnection, id: Uuid) -> AppResult<bool> {
    let result = test_run_invite::Entity::update_many()
        .col_expr(test_run_invite::Column::RevokedAt, Expr::value(Some(Utc::now())))
        .filter(test_run_invite::Column::Id.eq(id))
        .filter(test_run_invite::Column::RevokedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

#[async_trait::async_trait]
impl InviteResolver for DbPool {
    async fn resolve(&self, token: &str) -> AppResult<InviteTarget> {
        let invite = find_active_by_hash(self.connection(), &hash_token(token), Utc::now())
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(InviteTarget::from(invite))
    }
}
