use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::user::User;
use crate::types::UserRole;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub is_active: bool,
    #[serde(skip_serializing, default)]
    pub next_task_number: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

const PROJECT_COLUMNS: &str =
    "id, name, description, owner_id, is_active, next_task_number, created_at, updated_at";

impl Project {
    /// Prefix for human-readable task ids: first three characters of the
    /// project name, uppercased. Shorter names use what they have.
    pub fn task_prefix(name: &str) -> String {
        name.chars().take(3).collect::<String>().to_uppercase()
    }

    /// Creates the project and enrolls the owner as its first member.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateProject,
        owner_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = Uuid::new_v4();
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"INSERT INTO projects (id, name, description, owner_id)
               VALUES ($1, $2, $3, $4)
               RETURNING {PROJECT_COLUMNS}"#,
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)"#)
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(project)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Projects visible to `user`: everything for scrum masters, member
    /// projects only for employees.
    pub async fn find_for_user(pool: &SqlitePool, user: &User) -> Result<Vec<Self>, sqlx::Error> {
        match user.role {
            UserRole::ScrumMaster => {
                sqlx::query_as::<_, Project>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
                ))
                .fetch_all(pool)
                .await
            }
            UserRole::Employee => {
                sqlx::query_as::<_, Project>(
                    r#"SELECT p.id, p.name, p.description, p.owner_id, p.is_active,
                              p.next_task_number, p.created_at, p.updated_at
                       FROM projects p
                       JOIN project_members pm ON pm.project_id = p.id
                       WHERE pm.user_id = $1
                       ORDER BY p.created_at DESC"#,
                )
                .bind(user.id)
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"UPDATE projects
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   is_active = COALESCE($4, is_active),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {PROJECT_COLUMNS}"#,
        ))
        .bind(id)
        .bind(data.name.as_deref())
        .bind(data.description.as_deref())
        .bind(data.is_active)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM projects WHERE id = $1"#)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn add_member(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES ($1, $2)"#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove_member(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query(r#"DELETE FROM project_members WHERE project_id = $1 AND user_id = $2"#)
                .bind(project_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn is_member(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND user_id = $2"#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn members(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT u.id, u.username, u.email, u.first_name, u.last_name,
                      u.password_hash, u.role, u.created_at, u.updated_at
               FROM users u
               JOIN project_members pm ON pm.user_id = u.id
               WHERE pm.project_id = $1
               ORDER BY u.username"#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_prefix_uppercases_first_three_chars() {
        assert_eq!(Project::task_prefix("Orbit"), "ORB");
        assert_eq!(Project::task_prefix("taskflow internal system"), "TAS");
        assert_eq!(Project::task_prefix("io"), "IO");
    }
}
