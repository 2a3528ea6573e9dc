use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::activity_log::ActivityLog;
use crate::types::ActivityAction;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub content: String,
}

/// Activity descriptions keep the first 50 characters of the comment.
const PREVIEW_CHARS: usize = 50;

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

impl Comment {
    /// Inserts the comment and its `commented` activity entry atomically.
    pub async fn create(
        pool: &SqlitePool,
        task_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let comment = sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (id, task_id, author_id, content)
               VALUES ($1, $2, $3, $4)
               RETURNING id, task_id, author_id, content, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        ActivityLog::append(
            &mut tx,
            task_id,
            author_id,
            ActivityAction::Commented,
            &format!("Commented: {}", preview(content)),
            None,
            Some(preview(content)),
        )
        .await?;

        tx.commit().await?;
        Ok(comment)
    }

    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"SELECT id, task_id, author_id, content, created_at, updated_at
               FROM comments WHERE task_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"SELECT id, task_id, author_id, content, created_at, updated_at
               FROM comments WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM comments WHERE id = $1"#)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "x".repeat(80);
        assert_eq!(preview(&long).len(), 50);
        assert_eq!(preview("short"), "short");
        // multi-byte chars count as one
        let accented = "é".repeat(60);
        assert_eq!(preview(&accented).chars().count(), 50);
    }
}
