use std::collections::HashMap;

use chrono::{Duration, Utc};
use db::{
    models::{ActivityLog, Task, User, UserBehavior, activity_log::ActivityLogEntry},
    types::{TaskPriority, TaskStatus},
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

/// Behaviors and completions inside this window count as "recent".
const RECENT_WINDOW_DAYS: i64 = 7;
const RECENT_ACTIVITY_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub overview: Overview,
    pub user_metrics: UserMetrics,
    pub recent_activity: RecentActivity,
    pub distributions: Distributions,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub completion_rate: f64,
}

/// Metrics for the requesting user's own assignments.
#[derive(Debug, Clone, Serialize)]
pub struct UserMetrics {
    pub username: String,
    pub assigned_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub completion_rate: f64,
    pub recent_actions: i64,
    pub productivity_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentActivity {
    pub completed_tasks: Vec<Task>,
    pub activity_feed: Vec<ActivityLogEntry>,
    pub recent_behaviors: i64,
    pub total_behaviors: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Distributions {
    pub status: HashMap<TaskStatus, i64>,
    pub priority: HashMap<TaskPriority, i64>,
}

/// Percentage of `completed` out of `total`, rounded to two decimals.
/// An empty set rates as zero rather than dividing by it.
pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

/// Scope-level completion rate boosted by two points per recent action,
/// capped at 100. An empty scope scores zero regardless of activity.
pub fn productivity_score(rate: f64, total_tasks: i64, recent_actions: i64) -> f64 {
    if total_tasks == 0 {
        return 0.0;
    }
    (rate + 2.0 * recent_actions as f64).min(100.0)
}

pub struct AnalyticsService;

impl AnalyticsService {
    /// Assembles the dashboard for `user`, recomputed from current table
    /// state on every call. `project` narrows the task aggregates to one
    /// project; the requester's assignment counts always span everything
    /// assigned to them, while the productivity score follows the scope.
    pub async fn dashboard(
        pool: &SqlitePool,
        user: &User,
        project: Option<Uuid>,
    ) -> Result<Dashboard, AnalyticsError> {
        let status_counts: HashMap<TaskStatus, i64> = Task::count_by_status(pool, project, None)
            .await?
            .into_iter()
            .collect();
        let priority_counts: HashMap<TaskPriority, i64> = Task::count_by_priority(pool, project)
            .await?
            .into_iter()
            .collect();

        let count = |s: TaskStatus| status_counts.get(&s).copied().unwrap_or(0);
        let total_tasks: i64 = status_counts.values().sum();
        let completed_tasks = count(TaskStatus::Done);
        let overview = Overview {
            total_tasks,
            todo_tasks: count(TaskStatus::Todo),
            in_progress_tasks: count(TaskStatus::InProgress),
            completed_tasks,
            completion_rate: completion_rate(completed_tasks, total_tasks),
        };

        let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);

        let assigned: HashMap<TaskStatus, i64> = Task::count_by_status(pool, None, Some(user.id))
            .await?
            .into_iter()
            .collect();
        let assigned_total: i64 = assigned.values().sum();
        let assigned_done = assigned.get(&TaskStatus::Done).copied().unwrap_or(0);
        let recent_actions = UserBehavior::count_for_user_since(pool, user.id, since).await?;
        let user_metrics = UserMetrics {
            username: user.username.clone(),
            assigned_tasks: assigned_total,
            completed_tasks: assigned_done,
            in_progress_tasks: assigned.get(&TaskStatus::InProgress).copied().unwrap_or(0),
            completion_rate: completion_rate(assigned_done, assigned_total),
            recent_actions,
            // Scored off the scope-wide rate, not the requester's own.
            productivity_score: productivity_score(
                overview.completion_rate,
                overview.total_tasks,
                recent_actions,
            ),
        };

        let recent_activity = RecentActivity {
            completed_tasks: Task::completed_since(pool, project, since).await?,
            activity_feed: ActivityLog::recent(pool, project, RECENT_ACTIVITY_LIMIT).await?,
            recent_behaviors: recent_actions,
            total_behaviors: UserBehavior::count_for_user(pool, user.id).await?,
        };

        Ok(Dashboard {
            overview,
            user_metrics,
            recent_activity,
            distributions: Distributions {
                status: status_counts,
                priority: priority_counts,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_rounds_to_two_decimals() {
        assert_eq!(completion_rate(1, 3), 33.33);
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(4, 4), 100.0);
    }

    #[test]
    fn productivity_score_caps_at_hundred() {
        assert_eq!(productivity_score(50.0, 2, 10), 70.0);
        assert_eq!(productivity_score(90.0, 10, 10), 100.0);
        assert_eq!(productivity_score(0.0, 1, 3), 6.0);
    }

    #[test]
    fn productivity_score_is_zero_without_tasks() {
        assert_eq!(productivity_score(0.0, 0, 0), 0.0);
        assert_eq!(productivity_score(0.0, 0, 25), 0.0);
    }
}
