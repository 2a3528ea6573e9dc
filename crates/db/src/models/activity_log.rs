use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::types::ActivityAction;

/// Append-only audit trail of task mutations.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Activity row joined with the acting user's name and the task's human
/// label, for feeds.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLogEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub log: ActivityLog,
    pub username: String,
    pub task_label: String,
}

impl ActivityLog {
    /// Appends within the caller's transaction so the entry commits or rolls
    /// back together with the mutation it records.
    pub async fn append(
        tx: &mut Transaction<'_, Sqlite>,
        task_id: Uuid,
        user_id: Uuid,
        action: ActivityAction,
        description: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO activity_logs (id, task_id, user_id, action, description, old_value, new_value)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(user_id)
        .bind(action)
        .bind(description)
        .bind(old_value)
        .bind(new_value)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            r#"SELECT id, task_id, user_id, action, description, old_value, new_value, created_at
               FROM activity_logs WHERE task_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Most recent activity, newest first, optionally limited to one project.
    pub async fn recent(
        pool: &SqlitePool,
        project: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLogEntry>(
            r#"SELECT a.id, a.task_id, a.user_id, a.action, a.description, a.old_value,
                      a.new_value, a.created_at, u.username, t.task_id AS task_label
               FROM activity_logs a
               JOIN users u ON u.id = a.user_id
               JOIN tasks t ON t.id = a.task_id
               WHERE ($1 IS NULL OR t.project_id = $1)
               ORDER BY a.created_at DESC
               LIMIT $2"#,
        )
        .bind(project)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
