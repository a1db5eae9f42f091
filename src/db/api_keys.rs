//! Database operations for API keys using SeaORM.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::api_key;
use crate::error::AppResult;
use crate::models::ApiKey;

/// Insert a new API key.
pub async fn insert_api_key(db: &DatabaseConnection, key: &ApiKey) -> AppResult<()> {
    let model = api_key::ActiveModel {
        id: Set(key.id),
        user_id: Set(key.user_id),
        key_hash: Set(key.key_hash.clone()),
        key_prefix: Set(key.key_prefix.clone()),
        name: Set(key.name.clone()),
        expires_at: Set(key.expires_at),
        last_used_at: Set(key.last_used_at),
        created_at: Set(key.created_at),
        deleted_at: Set(key.deleted_at),
    };

    api_key::Entity::insert(model).exec(db).await?;

    Ok(())
}

/// Find an API key by its hash.
pub async fn find_by_hash(db: &DatabaseConnection, key_hash: &str) -> AppResult<Option<ApiKey>> {
    let result = api_key::Entity::find()
        .filter(api_key::Column::KeyHash.eq(key_hash))
        .one(db)
        .await?;

    Ok(result.map(ApiKey::from))
}

/// Update last used timestamp.
pub async fn update_last_used(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    api_key::Entity::update_many()
        .col_expr(api_key::Column::LastUsedAt, Expr::value(Some(Utc::now())))
        .filter(api_key::Column::Id.eq(id))
        .exec(db)
        .await?;

    Ok(())
}

/// Revoke an API key (soft delete). Returns false if unknown or already revoked.
pub async fn revoke(db: &DatabaseConnection, id: Uuid) -> AppResult<bool> {
    let result = api_key::Entity::update_many()
        .col_expr(api_key::Column::DeletedAt, Expr::value(Some(Utc::now())))
        .filter(api_key::Column::Id.eq(id))
        .filter(api_key::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}
