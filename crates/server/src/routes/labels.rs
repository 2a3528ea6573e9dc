use axum::{
    Extension, Json,
    extract::{Path, State},
    response::Json as ResponseJson,
};
use db::models::{Label, Project, Task, User, label::CreateLabel};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    http::auth::{ensure_project_access, ensure_task_access},
};

pub async fn get_project_labels(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Label>>>, ApiError> {
    ensure_project_access(&state.db.pool, &user, &project).await?;
    let labels = Label::find_by_project_id(&state.db.pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(labels)))
}

pub async fn create_label(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<CreateLabel>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    ensure_project_access(&state.db.pool, &user, &project).await?;
    if payload.name.trim().is_empty() {
        return Err("Label name must not be empty".into());
    }
    let label = Label::create(&state.db.pool, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(label)))
}

async fn load_task_with_access(
    state: &AppState,
    user: &User,
    task_id: Uuid,
) -> Result<Task, ApiError> {
    let task = Task::find_by_id(&state.db.pool, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    ensure_task_access(&state.db.pool, user, &task).await?;
    Ok(task)
}

pub async fn get_task_labels(
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Label>>>, ApiError> {
    ensure_task_access(&state.db.pool, &user, &task).await?;
    let labels = Label::find_by_task_id(&state.db.pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(labels)))
}

pub async fn attach_label(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Path((task_id, label_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let task = load_task_with_access(&state, &user, task_id).await?;
    let label = Label::find_by_id(&state.db.pool, label_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Label not found".to_string()))?;
    if label.project_id != task.project_id {
        return Err("Label belongs to a different project".into());
    }
    Label::attach(&state.db.pool, task.id, label_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn detach_label(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Path((task_id, label_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let task = load_task_with_access(&state, &user, task_id).await?;
    let detached = Label::detach(&state.db.pool, task.id, label_id).await?;
    if detached == 0 {
        return Err(ApiError::NotFound("Label is not attached".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}
