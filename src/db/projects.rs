//! Database queries for projects.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::project::{self, ActiveModel, Entity as Project};
use crate::error::AppResult;

use super::DbPool;

/// Find a live project by ID.
pub async fn find_live<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<project::Model>> {
    let result = Project::find_by_id(id)
        .filter(project::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(result)
}

impl DbPool {
    /// Insert a new project.
    pub async fn insert_project(
        &self,
        title: &str,
        code: &str,
        owner_id: Uuid,
        is_public: bool,
    ) -> AppResult<project::Model> {
        let now = Utc::now();

        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            title: Set(title.to_string()),
            code: Set(code.to_string()),
            owner_id: Set(owner_id),
            is_active: Set(true),
            is_public: Set(is_public),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        Ok(model.insert(self.connection()).await?)
    }

    /// Get a live project by ID.
    pub async fn get_project(&self, id: Uuid) -> AppResult<Option<project::Model>> {
        find_live(self.connection(), id).await
    }

    /// List live projects, newest first.
    pub async fn list_projects(&self) -> AppResult<Vec<project::Model>> {
        let result = Project::find()
            .filter(project::Column::DeletedAt.is_null())
            .order_by_desc(project::Column::Id) // UUIDv7 is time-ordered
            .all(self.connection())
            .await?;

        Ok(result)
    }

    /// Tombstone a project. Returns false when it was unknown or already deleted.
    pub async fn soft_delete_project(&self, id: Uuid) -> AppResult<bool> {
        let now = Utc::now();

        let result = Project::update_many()
            .col_expr(project::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(project::Column::IsActive, Expr::value(false))
            .col_expr(project::Column::UpdatedAt, Expr::value(now))
            .filter(project::Column::Id.eq(id))
            .filter(project::Column::DeletedAt.is_null())
            .exec(self.connection())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
