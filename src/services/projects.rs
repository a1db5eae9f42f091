//! Project creation and deletion.

use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CreateProjectRequest, Project};

/// Project codes: 2-10 uppercase letters or digits, starting with a letter.
pub fn validate_project_code(code: &str) -> AppResult<()> {
    let valid = (2..=10).contains(&code.len())
        && code.starts_with(|c: char| c.is_ascii_uppercase())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

    if !valid {
        return Err(AppError::Validation(format!(
            "Project code '{}' must be 2-10 uppercase letters or digits and start with a letter",
            code
        )));
    }
    Ok(())
}

/// Create a project owned by `owner_id`.
pub async fn create_project(
    pool: &DbPool,
    owner_id: Uuid,
    req: &CreateProjectRequest,
) -> AppResult<Project> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Project title is required".to_string()));
    }
    let code = req.code.trim();
    validate_project_code(code)?;

    let project = pool
        .insert_project(title, code, owner_id, req.is_public)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Project code '{}' is already taken", code))
            }
            other => other,
        })?;

    tracing::info!(project_id = %project.id, code = %project.code, "Created project");
    Ok(project.into())
}

/// Fetch a live project or fail with `NotFound`.
pub async fn get_project(pool: &DbPool, id: Uuid) -> AppResult<Project> {
    pool.get_project(id)
        .await?
        .map(Project::from)
        .ok_or_else(|| AppError::NotFound(format!("Project {}", id)))
}

/// Live projects, newest first.
pub async fn list_projects(pool: &DbPool) -> AppResult<Vec<Project>> {
    Ok(pool
        .list_projects()
        .await?
        .into_iter()
        .map(Project::from)
        .collect())
}

/// Tombstone a project.
pub async fn delete_project(pool: &DbPool, id: Uuid) -> AppResult<()> {
    if !pool.soft_delete_project(id).await? {
        return Err(AppError::NotFound(format!("Project {}", id)));
    }
    tracing::info!(project_id = %id, "Deleted project");
    Ok(())
}
