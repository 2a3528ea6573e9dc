use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::delete,
};
use db::models::{Comment, Task, User, comment::CreateComment};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::ensure_task_access};

pub async fn get_comments(
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Comment>>>, ApiError> {
    ensure_task_access(&state.db.pool, &user, &task).await?;
    let comments = Comment::find_by_task_id(&state.db.pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(comments)))
}

pub async fn create_comment(
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<CreateComment>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    ensure_task_access(&state.db.pool, &user, &task).await?;
    if payload.content.trim().is_empty() {
        return Err("Comment must not be empty".into());
    }
    let comment = Comment::create(&state.db.pool, task.id, user.id, &payload.content).await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

/// Authors may delete their own comments; scrum masters may delete any.
pub async fn delete_comment(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let comment = Comment::find_by_id(&state.db.pool, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    if comment.author_id != user.id && !user.role.is_scrum_master() {
        return Err(ApiError::Forbidden(
            "You may only delete your own comments".to_string(),
        ));
    }
    Comment::delete(&state.db.pool, comment_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/comments/{id}", delete(delete_comment))
}
