use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// Free-form behavioral events (logins, board moves, searches) recorded for
/// the analytics dashboard. Unlike [`super::ActivityLog`] these are only
/// optionally tied to a task, and clients may report them after the fact.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserBehavior {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action_type: String,
    pub task_id: Option<Uuid>,
    pub duration_seconds: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateUserBehavior {
    pub action_type: String,
    pub task: Option<Uuid>,
    pub duration_seconds: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

const BEHAVIOR_COLUMNS: &str =
    "id, user_id, action_type, task_id, duration_seconds, metadata, created_at";

impl UserBehavior {
    pub async fn record(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateUserBehavior,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserBehavior>(&format!(
            r#"INSERT INTO user_behaviors (id, user_id, action_type, task_id, duration_seconds, metadata)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {BEHAVIOR_COLUMNS}"#,
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&data.action_type)
        .bind(data.task)
        .bind(data.duration_seconds)
        .bind(data.metadata.as_ref())
        .fetch_one(pool)
        .await
    }

    pub async fn count_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM user_behaviors WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn count_for_user_since(
        pool: &SqlitePool,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM user_behaviors
               WHERE user_id = $1 AND created_at >= datetime($2, 'subsec')"#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }
}
