use db::{models::Task, types::TaskStatus};
use serde::Serialize;

/// A project's tasks grouped into fixed status columns, left to right in
/// workflow order. Every column is present even when empty.
#[derive(Debug, Clone, Serialize)]
pub struct KanbanBoard {
    pub columns: Vec<KanbanColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub name: &'static str,
    pub count: usize,
    pub tasks: Vec<Task>,
}

impl KanbanBoard {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut columns: Vec<KanbanColumn> = TaskStatus::ALL
            .into_iter()
            .map(|status| KanbanColumn {
                status,
                name: status.display_name(),
                count: 0,
                tasks: Vec::new(),
            })
            .collect();
        for task in tasks {
            if let Some(column) = columns.iter_mut().find(|c| c.status == task.status) {
                column.tasks.push(task);
            }
        }
        for column in &mut columns {
            column.count = column.tasks.len();
        }
        Self { columns }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::types::TaskPriority;
    use uuid::Uuid;

    use super::*;

    fn task(status: TaskStatus, title: &str) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            task_id: "TST-1".to_string(),
            title: title.to_string(),
            description: String::new(),
            status,
            priority: TaskPriority::Medium,
            assigned_to: None,
            created_by: Uuid::new_v4(),
            due_date: None,
            estimated_hours: None,
            actual_hours: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn groups_tasks_into_ordered_columns() {
        let board = KanbanBoard::from_tasks(vec![
            task(TaskStatus::Done, "shipped"),
            task(TaskStatus::Todo, "queued"),
            task(TaskStatus::Todo, "also queued"),
        ]);
        let statuses: Vec<TaskStatus> = board.columns.iter().map(|c| c.status).collect();
        assert_eq!(statuses, TaskStatus::ALL.to_vec());
        assert_eq!(board.columns[0].tasks.len(), 2);
        assert_eq!(board.columns[0].count, 2);
        assert_eq!(board.columns[0].name, "To Do");
        assert_eq!(board.columns[1].tasks.len(), 0);
        assert_eq!(board.columns[3].tasks.len(), 1);
    }

    #[test]
    fn empty_board_still_has_all_columns() {
        let board = KanbanBoard::from_tasks(Vec::new());
        assert_eq!(board.columns.len(), 4);
        assert!(board.columns.iter().all(|c| c.tasks.is_empty()));
    }
}
