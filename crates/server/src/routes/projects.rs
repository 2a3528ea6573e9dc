use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::{
    Project, Task, User,
    project::{CreateProject, UpdateProject},
};
use serde::Deserialize;
use services::services::KanbanBoard;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::labels;
use crate::{
    AppState,
    error::ApiError,
    http::auth::{ensure_project_access, ensure_scrum_master},
    middleware::load_project_middleware,
};

pub async fn get_projects(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_for_user(&state.db.pool, &user).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn create_project(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err("Project name must not be empty".into());
    }
    tracing::debug!("Creating project '{}'", payload.name);
    let project = Project::create(&state.db.pool, &payload, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_project_access(&state.db.pool, &user, &project).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn update_project(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_project_access(&state.db.pool, &user, &project).await?;
    let updated = Project::update(&state.db.pool, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_project(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_scrum_master(&user)?;
    Project::delete(&state.db.pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_project_tasks(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    ensure_project_access(&state.db.pool, &user, &project).await?;
    let tasks = Task::find_by_project_id(&state.db.pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

/// The project's tasks grouped into status columns for the board view.
pub async fn get_kanban(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<KanbanBoard>>, ApiError> {
    let project = Project::find_by_id(&state.db.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    ensure_project_access(&state.db.pool, &user, &project).await?;
    let tasks = Task::find_by_project_id(&state.db.pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(KanbanBoard::from_tasks(
        tasks,
    ))))
}

pub async fn get_members(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    ensure_project_access(&state.db.pool, &user, &project).await?;
    let members = Project::members(&state.db.pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

pub async fn add_member(
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_scrum_master(&user)?;
    if User::find_by_id(&state.db.pool, payload.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Project::add_member(&state.db.pool, project.id, payload.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn remove_member(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_scrum_master(&user)?;
    if Project::find_by_id(&state.db.pool, project_id).await?.is_none() {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    let removed = Project::remove_member(&state.db.pool, project_id, member_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Membership not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/tasks", get(get_project_tasks))
        .route(
            "/labels",
            get(labels::get_project_labels).post(labels::create_label),
        )
        .route("/members", get(get_members).post(add_member))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    let projects_router = Router::new()
        .route("/", get(get_projects).post(create_project))
        .route("/{project_id}/members/{member_id}", delete(remove_member))
        .nest("/{id}", project_id_router);

    Router::new()
        .nest("/projects", projects_router)
        .route("/kanban/{project_id}", get(get_kanban))
}
