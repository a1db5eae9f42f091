//! Database operations for users.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::user;
use crate::error::AppResult;
use crate::models::{CreateUserRequest, UserRole};

/// Insert a new user.
pub async fn insert_user(db: &DatabaseConnection, req: &CreateUserRequest) -> AppResult<user::Model> {
    let now = Utc::now();

    let model = user::ActiveModel {
        id: Set(Uuid::now_v7()),
        username: Set(req.username.trim().to_string()),
        display_name: Set(req.display_name.clone()),
        role: Set(req.role.unwrap_or_default().as_str().to_string()),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    Ok(model.insert(db).await?)
}

/// Find a live user by ID.
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<user::Model>> {
    let result = user::Entity::find_by_id(id)
        .filter(user::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(result)
}

/// Fetch users by ID, tombstoned ones included (historical attribution).
pub async fn find_by_ids(db: &DatabaseConnection, ids: Vec<Uuid>) -> AppResult<Vec<user::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let result = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?;

    Ok(result)
}

/// Record a successful authentication.
pub async fn touch_last_login(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    user::Entity::update_many()
        .col_expr(user::Column::LastLoginAt, Expr::value(Some(Utc::now())))
        .filter(user::Column::Id.eq(id))
        .exec(db)
        .await?;

    Ok(())
}

/// Parse a stored role, falling back to the least surprising default.
pub fn role_of(m: &user::Model) -> UserRole {
    UserRole::parse(&m.role).unwrap_or_default()
}
