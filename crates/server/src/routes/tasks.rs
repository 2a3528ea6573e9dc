use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::{
    models::{
        ActivityLog, Project, Task, User,
        task::{CreateTask, TaskFilter, UpdateTask},
    },
    types::TaskStatus,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{comments, labels};
use crate::{
    AppState,
    error::ApiError,
    http::auth::{ensure_project_access, ensure_scrum_master, ensure_task_access},
    middleware::load_task_middleware,
};

pub async fn get_tasks(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_for_user(&state.db.pool, &user, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub project: Option<Uuid>,
}

/// Substring search over title and description, scoped like the task listing
/// and capped at a fixed number of rows.
pub async fn search_tasks(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    if query.q.trim().is_empty() {
        return Err("Search query must not be empty".into());
    }
    let tasks = Task::search(&state.db.pool, &user, query.q.trim(), query.project).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_task(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err("Task title must not be empty".into());
    }
    let project = Project::find_by_id(&state.db.pool, payload.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    ensure_project_access(&state.db.pool, &user, &project).await?;

    tracing::debug!("Creating task '{}' in project '{}'", payload.title, project.name);
    let task = Task::create(&state.db.pool, &payload, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    ensure_task_access(&state.db.pool, &user, &task).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    ensure_task_access(&state.db.pool, &user, &task).await?;
    let updated = Task::update(&state.db.pool, task.id, &payload, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_task(
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_scrum_master(&user)?;
    Task::delete(&state.db.pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_task_activity(
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityLog>>>, ApiError> {
    ensure_task_access(&state.db.pool, &user, &task).await?;
    let logs = ActivityLog::find_by_task_id(&state.db.pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(logs)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub task_id: Uuid,
    pub status: TaskStatus,
}

/// Board drag-and-drop endpoint. The status write and its activity entry
/// commit atomically; nothing else on the task changes.
pub async fn update_task_status(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::find_by_id(&state.db.pool, payload.task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    ensure_task_access(&state.db.pool, &user, &task).await?;

    let updated = Task::update_status(&state.db.pool, payload.task_id, payload.status, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).patch(update_task).delete(delete_task))
        .route("/activity", get(get_task_activity))
        .route(
            "/comments",
            get(comments::get_comments).post(comments::create_comment),
        )
        .route("/labels", get(labels::get_task_labels))
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    let tasks_router = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .route("/search", get(search_tasks))
        .route("/status-update", patch(update_task_status))
        .route(
            "/{task_id}/labels/{label_id}",
            post(labels::attach_label).delete(labels::detach_label),
        )
        .nest("/{id}", task_id_router);

    Router::new().nest("/tasks", tasks_router)
}
