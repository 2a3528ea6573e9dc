use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Label {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabel {
    pub name: String,
    pub color: Option<String>,
}

impl Label {
    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        data: &CreateLabel,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"INSERT INTO labels (id, project_id, name, color)
               VALUES ($1, $2, $3, COALESCE($4, '#007bff'))
               RETURNING id, project_id, name, color, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&data.name)
        .bind(data.color.as_deref())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"SELECT id, project_id, name, color, created_at
               FROM labels WHERE project_id = $1 ORDER BY name"#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"SELECT id, project_id, name, color, created_at FROM labels WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"SELECT l.id, l.project_id, l.name, l.color, l.created_at
               FROM labels l
               JOIN task_labels tl ON tl.label_id = l.id
               WHERE tl.task_id = $1
               ORDER BY l.name"#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn attach(
        pool: &SqlitePool,
        task_id: Uuid,
        label_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(r#"INSERT OR IGNORE INTO task_labels (task_id, label_id) VALUES ($1, $2)"#)
            .bind(task_id)
            .bind(label_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn detach(
        pool: &SqlitePool,
        task_id: Uuid,
        label_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query(r#"DELETE FROM task_labels WHERE task_id = $1 AND label_id = $2"#)
                .bind(task_id)
                .bind(label_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
