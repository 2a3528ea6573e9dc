use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use db::models::{Project, Task, User};
use sqlx::SqlitePool;
use utils_jwt::TokenKind;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Validates the bearer access token and stashes the authenticated [`User`]
/// as a request extension for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.tokens.verify(token, TokenKind::Access)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;
    let user = User::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn ensure_scrum_master(user: &User) -> Result<(), ApiError> {
    if user.role.is_scrum_master() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only scrum masters may perform this action".to_string(),
        ))
    }
}

/// Scrum masters reach every project; employees must be members.
pub async fn ensure_project_access(
    pool: &SqlitePool,
    user: &User,
    project: &Project,
) -> Result<(), ApiError> {
    if user.role.is_scrum_master() || Project::is_member(pool, project.id, user.id).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You are not a member of this project".to_string(),
        ))
    }
}

/// Resolves the task's project and applies the membership check.
pub async fn ensure_task_access(
    pool: &SqlitePool,
    user: &User,
    task: &Task,
) -> Result<(), ApiError> {
    let project = Project::find_by_id(pool, task.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    ensure_project_access(pool, user, &project).await
}
