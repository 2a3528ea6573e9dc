use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{User, UserBehavior, user_behavior::CreateUserBehavior};
use serde::Deserialize;
use services::services::analytics::{AnalyticsService, Dashboard};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub project: Option<Uuid>,
}

pub async fn get_dashboard(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<ResponseJson<ApiResponse<Dashboard>>, ApiError> {
    let dashboard = AnalyticsService::dashboard(&state.db.pool, &user, query.project).await?;
    Ok(ResponseJson(ApiResponse::success(dashboard)))
}

/// Clients report behavioral events (board moves, searches, completions)
/// after the fact; the server only validates and stores them.
pub async fn record_behavior(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserBehavior>,
) -> Result<ResponseJson<ApiResponse<UserBehavior>>, ApiError> {
    if payload.action_type.trim().is_empty() {
        return Err("Action type must not be empty".into());
    }
    let behavior = UserBehavior::record(&state.db.pool, user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(behavior)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics/dashboard", get(get_dashboard))
        .route("/analytics/behavior", post(record_behavior))
}
