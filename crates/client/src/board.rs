use db::{models::Task, types::TaskStatus};
use serde::Deserialize;
use uuid::Uuid;

/// Wire shape of the kanban endpoint.
#[derive(Debug, Deserialize)]
pub struct KanbanResponse {
    pub columns: Vec<KanbanColumn>,
}

#[derive(Debug, Deserialize)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// Local copy of a project board that cards can be moved on before the
/// server confirms. [`BoardState::begin_move`] hands back the undo record
/// needed to put a card back if the server rejects the move.
#[derive(Debug)]
pub struct BoardState {
    columns: Vec<KanbanColumn>,
}

/// Where a card was before an optimistic move.
#[derive(Debug, Clone, Copy)]
pub struct MoveUndo {
    task_id: Uuid,
    from: TaskStatus,
    to: TaskStatus,
    index: usize,
}

impl From<KanbanResponse> for BoardState {
    fn from(response: KanbanResponse) -> Self {
        Self {
            columns: response.columns,
        }
    }
}

impl BoardState {
    pub fn column(&self, status: TaskStatus) -> Option<&[Task]> {
        self.columns
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.tasks.as_slice())
    }

    fn column_mut(&mut self, status: TaskStatus) -> Option<&mut Vec<Task>> {
        self.columns
            .iter_mut()
            .find(|c| c.status == status)
            .map(|c| &mut c.tasks)
    }

    /// Moves the card to the end of the target column and returns the undo
    /// record. `None` when the card is not on the board or is already in the
    /// target column.
    pub fn begin_move(&mut self, task_id: Uuid, to: TaskStatus) -> Option<MoveUndo> {
        let (from, index) = self.locate(task_id)?;
        if from == to {
            return None;
        }
        let source = self.column_mut(from)?;
        let mut task = source.remove(index);
        task.status = to;
        self.column_mut(to)?.push(task);
        Some(MoveUndo {
            task_id,
            from,
            to,
            index,
        })
    }

    /// Puts the card back at its original position after a rejected move.
    pub fn revert(&mut self, undo: MoveUndo) {
        let Some(target) = self.column_mut(undo.to) else {
            return;
        };
        let Some(position) = target.iter().position(|t| t.id == undo.task_id) else {
            return;
        };
        let mut task = target.remove(position);
        task.status = undo.from;
        if let Some(source) = self.column_mut(undo.from) {
            let index = undo.index.min(source.len());
            source.insert(index, task);
        }
    }

    fn locate(&self, task_id: Uuid) -> Option<(TaskStatus, usize)> {
        for column in &self.columns {
            if let Some(index) = column.tasks.iter().position(|t| t.id == task_id) {
                return Some((column.status, index));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::types::TaskPriority;

    use super::*;

    fn task(title: &str, status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            task_id: format!("TST-{title}"),
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

    fn board(tasks: Vec<Task>) -> BoardState {
        let columns = TaskStatus::ALL
            .into_iter()
            .map(|status| KanbanColumn {
                status,
                tasks: tasks.iter().filter(|t| t.status == status).cloned().collect(),
            })
            .collect();
        BoardState { columns }
    }

    #[test]
    fn begin_move_relocates_card_and_updates_status() {
        let a = task("a", TaskStatus::Todo);
        let id = a.id;
        let mut board = board(vec![a, task("b", TaskStatus::Todo)]);

        let undo = board.begin_move(id, TaskStatus::Done).expect("undo");
        assert_eq!(board.column(TaskStatus::Todo).unwrap().len(), 1);
        let done = board.column(TaskStatus::Done).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].status, TaskStatus::Done);

        board.revert(undo);
        let todo = board.column(TaskStatus::Todo).unwrap();
        assert_eq!(todo.len(), 2);
        assert_eq!(todo[0].id, id);
        assert_eq!(todo[0].status, TaskStatus::Todo);
        assert!(board.column(TaskStatus::Done).unwrap().is_empty());
    }

    #[test]
    fn revert_restores_original_position() {
        let a = task("a", TaskStatus::Todo);
        let b = task("b", TaskStatus::Todo);
        let c = task("c", TaskStatus::Todo);
        let id = b.id;
        let mut board = board(vec![a, b, c]);

        let undo = board.begin_move(id, TaskStatus::InProgress).expect("undo");
        board.revert(undo);
        let todo = board.column(TaskStatus::Todo).unwrap();
        assert_eq!(todo[1].id, id);
    }

    #[test]
    fn noop_and_unknown_moves_return_none() {
        let a = task("a", TaskStatus::Todo);
        let id = a.id;
        let mut board = board(vec![a]);

        assert!(board.begin_move(id, TaskStatus::Todo).is_none());
        assert!(board.begin_move(Uuid::new_v4(), TaskStatus::Done).is_none());
        assert_eq!(board.column(TaskStatus::Todo).unwrap().len(), 1);
    }
}
