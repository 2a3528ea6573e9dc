use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::{activity_log::ActivityLog, project::Project, user::User};
use crate::types::{ActivityAction, TaskPriority, TaskStatus, UserRole};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Human-readable label like `ORB-4`. Assigned at creation, never changed.
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub labels: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<Uuid>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_hours: Option<Option<f64>>,
    pub actual_hours: Option<f64>,
    pub labels: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub project: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
}

pub const SEARCH_LIMIT: i64 = 20;

const TASK_COLUMNS: &str = "id, project_id, task_id, title, description, status, priority, \
                            assigned_to, created_by, due_date, estimated_hours, actual_hours, \
                            created_at, updated_at";

impl Task {
    /// Creates the task inside one transaction: reserves the project's next
    /// task number, derives the label from the project name, associates any
    /// labels, and appends the `created` activity entry. Concurrent creators
    /// get distinct numbers.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateTask,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (name, reserved): (String, i64) = sqlx::query_as(
            r#"UPDATE projects
               SET next_task_number = next_task_number + 1
               WHERE id = $1
               RETURNING name, next_task_number"#,
        )
        .bind(data.project_id)
        .fetch_one(&mut *tx)
        .await?;
        let label = format!("{}-{}", Project::task_prefix(&name), reserved - 1);

        let id = Uuid::new_v4();
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"INSERT INTO tasks (id, project_id, task_id, title, description, status, priority,
                                  assigned_to, created_by, due_date, estimated_hours)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(id)
        .bind(data.project_id)
        .bind(&label)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status.unwrap_or_default())
        .bind(data.priority.unwrap_or_default())
        .bind(data.assigned_to)
        .bind(created_by)
        .bind(data.due_date)
        .bind(data.estimated_hours)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(labels) = &data.labels {
            Self::replace_labels(&mut tx, id, labels).await?;
        }

        ActivityLog::append(
            &mut tx,
            id,
            created_by,
            ActivityAction::Created,
            &format!("Task {label} created"),
            None,
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(r#"SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"#))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC"#
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Tasks visible to `user`, optionally narrowed by project, status, or
    /// assignee. Employees only see tasks in projects they belong to.
    pub async fn find_for_user(
        pool: &SqlitePool,
        user: &User,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        // Scrum masters pass NULL for $1 which disables the membership scope.
        let member_scope = Self::member_scope(user);
        sqlx::query_as::<_, Task>(&format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks
               WHERE ($1 IS NULL
                      OR project_id IN (SELECT project_id FROM project_members WHERE user_id = $1))
                 AND ($2 IS NULL OR project_id = $2)
                 AND ($3 IS NULL OR status = $3)
                 AND ($4 IS NULL OR assigned_to = $4)
               ORDER BY created_at DESC"#
        ))
        .bind(member_scope)
        .bind(filter.project)
        .bind(filter.status)
        .bind(filter.assigned_to)
        .fetch_all(pool)
        .await
    }

    /// Case-insensitive substring search over title and description, scoped
    /// like [`Task::find_for_user`] and capped at [`SEARCH_LIMIT`] rows.
    pub async fn search(
        pool: &SqlitePool,
        user: &User,
        query: &str,
        project: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let member_scope = Self::member_scope(user);
        sqlx::query_as::<_, Task>(&format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks
               WHERE ($1 IS NULL
                      OR project_id IN (SELECT project_id FROM project_members WHERE user_id = $1))
                 AND ($2 IS NULL OR project_id = $2)
                 AND (title LIKE '%' || $3 || '%' OR description LIKE '%' || $3 || '%')
               ORDER BY created_at DESC
               LIMIT $4"#
        ))
        .bind(member_scope)
        .bind(project)
        .bind(query)
        .bind(SEARCH_LIMIT)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial edit and appends one activity entry. A status change
    /// wins over an assignee change, which wins over a plain `updated`.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateTask,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(before) = sqlx::query_as::<_, Task>(&format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let assigned_to = data.assigned_to.unwrap_or(before.assigned_to);
        let due_date = data.due_date.unwrap_or(before.due_date);
        let estimated_hours = data.estimated_hours.unwrap_or(before.estimated_hours);
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"UPDATE tasks
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   status = COALESCE($4, status),
                   priority = COALESCE($5, priority),
                   assigned_to = $6,
                   due_date = $7,
                   estimated_hours = $8,
                   actual_hours = COALESCE($9, actual_hours),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(id)
        .bind(data.title.as_deref())
        .bind(data.description.as_deref())
        .bind(data.status)
        .bind(data.priority)
        .bind(assigned_to)
        .bind(due_date)
        .bind(estimated_hours)
        .bind(data.actual_hours)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(labels) = &data.labels {
            Self::replace_labels(&mut tx, id, labels).await?;
        }

        if task.status != before.status {
            ActivityLog::append(
                &mut tx,
                id,
                user_id,
                ActivityAction::StatusChanged,
                &format!("Status changed from {} to {}", before.status, task.status),
                Some(before.status.to_string()),
                Some(task.status.to_string()),
            )
            .await?;
        } else if assigned_to != before.assigned_to {
            ActivityLog::append(
                &mut tx,
                id,
                user_id,
                ActivityAction::Assigned,
                "Assignee changed",
                None,
                None,
            )
            .await?;
        } else {
            ActivityLog::append(
                &mut tx,
                id,
                user_id,
                ActivityAction::Updated,
                "Task updated",
                None,
                None,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(Some(task))
    }

    /// Moves the task to `status`. The write and its `status_changed` activity
    /// entry commit together; nothing else is touched. Returns `None` when the
    /// task does not exist, in which case no entry is appended.
    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: TaskStatus,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(old_status) = sqlx::query_scalar::<_, TaskStatus>(
            r#"SELECT status FROM tasks WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"UPDATE tasks
               SET status = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"#
        ))
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        ActivityLog::append(
            &mut tx,
            id,
            user_id,
            ActivityAction::StatusChanged,
            &format!("Status changed from {old_status} to {status}"),
            Some(old_status.to_string()),
            Some(status.to_string()),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    /// Task counts per status, optionally restricted to one project or one
    /// assignee.
    pub async fn count_by_status(
        pool: &SqlitePool,
        project: Option<Uuid>,
        assigned_to: Option<Uuid>,
    ) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT status, COUNT(*) FROM tasks
               WHERE ($1 IS NULL OR project_id = $1)
                 AND ($2 IS NULL OR assigned_to = $2)
               GROUP BY status"#,
        )
        .bind(project)
        .bind(assigned_to)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_priority(
        pool: &SqlitePool,
        project: Option<Uuid>,
    ) -> Result<Vec<(TaskPriority, i64)>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT priority, COUNT(*) FROM tasks
               WHERE ($1 IS NULL OR project_id = $1)
               GROUP BY priority"#,
        )
        .bind(project)
        .fetch_all(pool)
        .await
    }

    /// Tasks moved to `done` since `since`, most recent first.
    pub async fn completed_since(
        pool: &SqlitePool,
        project: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks
               WHERE ($1 IS NULL OR project_id = $1)
                 AND status = 'done'
                 AND updated_at >= datetime($2, 'subsec')
               ORDER BY updated_at DESC"#
        ))
        .bind(project)
        .bind(since)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM tasks WHERE id = $1"#)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn member_scope(user: &User) -> Option<Uuid> {
        match user.role {
            UserRole::ScrumMaster => None,
            UserRole::Employee => Some(user.id),
        }
    }

    async fn replace_labels(
        tx: &mut Transaction<'_, Sqlite>,
        task_id: Uuid,
        labels: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(r#"DELETE FROM task_labels WHERE task_id = $1"#)
            .bind(task_id)
            .execute(&mut **tx)
            .await?;
        for label_id in labels {
            sqlx::query(
                r#"INSERT OR IGNORE INTO task_labels (task_id, label_id) VALUES ($1, $2)"#,
            )
            .bind(task_id)
            .bind(label_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
