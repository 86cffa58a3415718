//! Kanban view projection.
//!
//! # Responsibility
//! - Partition a flat task list into the three board columns.
//! - Classify due dates for card highlighting.
//!
//! # Invariants
//! - Every task lands in exactly one column, chosen by `status`.
//! - Column order follows the input order.
//! - Projection is pure and recomputed from scratch on each call.

use crate::model::task::{Task, TaskStatus};
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

/// Board partitions derived from one project's tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KanbanBoard {
    pub todo: Vec<Task>,
    pub doing: Vec<Task>,
    pub done: Vec<Task>,
}

impl KanbanBoard {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut board = Self::default();
        for task in tasks {
            board.column_mut(task.status).push(task.clone());
        }
        board
    }

    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::Doing => &self.doing,
            TaskStatus::Done => &self.done,
        }
    }

    fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        match status {
            TaskStatus::Todo => &mut self.todo,
            TaskStatus::Doing => &mut self.doing,
            TaskStatus::Done => &mut self.done,
        }
    }

    /// `(todo, doing, done)` sizes.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.todo.len(), self.doing.len(), self.done.len())
    }

    pub fn total(&self) -> usize {
        self.todo.len() + self.doing.len() + self.done.len()
    }

    /// Columns in board order, ready for rendering.
    pub fn columns(&self) -> Vec<ColumnView<'_>> {
        TaskStatus::ALL
            .iter()
            .map(|&status| ColumnView {
                status,
                title: column_title(status),
                tasks: self.column(status),
            })
            .collect()
    }
}

/// One rendered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnView<'a> {
    pub status: TaskStatus,
    pub title: &'static str,
    pub tasks: &'a [Task],
}

impl ColumnView<'_> {
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

pub fn column_title(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "To Do",
        TaskStatus::Doing => "In Progress",
        TaskStatus::Done => "Done",
    }
}

/// Highlight class of a card's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Overdue,
    DueToday,
    DueTomorrow,
    /// No due date, or due after tomorrow.
    Normal,
}

/// Classifies `due_date` against `now` by calendar day in local time.
pub fn due_state(due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DueState {
    due_state_in(due_date, now, &Local)
}

/// Same as [`due_state`] for an explicit time zone.
pub fn due_state_in<Tz: TimeZone>(
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    zone: &Tz,
) -> DueState {
    let Some(due_date) = due_date else {
        return DueState::Normal;
    };
    let today: NaiveDate = now.with_timezone(zone).date_naive();
    let due_day: NaiveDate = due_date.with_timezone(zone).date_naive();

    if due_day < today {
        DueState::Overdue
    } else if due_day == today {
        DueState::DueToday
    } else if Some(due_day) == today.checked_add_days(Days::new(1)) {
        DueState::DueTomorrow
    } else {
        DueState::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::{due_state_in, DueState, KanbanBoard};
    use crate::model::task::{Task, TaskStatus};
    use chrono::{Duration, FixedOffset, TimeZone, Utc};

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            project_id: "p1".to_string(),
            title: id.to_string(),
            description: String::new(),
            status,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            due_date: None,
            assigned_to: None,
            is_archived: false,
        }
    }

    #[test]
    fn board_partitions_by_status_preserving_order() {
        let tasks = vec![
            task("a", TaskStatus::Doing),
            task("b", TaskStatus::Todo),
            task("c", TaskStatus::Doing),
            task("d", TaskStatus::Done),
        ];
        let board = KanbanBoard::from_tasks(&tasks);

        assert_eq!(board.counts(), (1, 2, 1));
        assert_eq!(board.total(), tasks.len());
        let doing: Vec<&str> = board.doing.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(doing, vec!["a", "c"]);
    }

    #[test]
    fn columns_follow_board_order() {
        let board = KanbanBoard::from_tasks(&[task("a", TaskStatus::Done)]);
        let columns = board.columns();
        let titles: Vec<&str> = columns.iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);
        assert_eq!(columns[2].count(), 1);
        assert!(columns[0].is_empty());
    }

    #[test]
    fn due_state_compares_local_calendar_days() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        // 23:30 local on March 10.
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 21, 30, 0).unwrap();

        assert_eq!(due_state_in(None, now, &zone), DueState::Normal);
        assert_eq!(
            due_state_in(Some(now - Duration::days(1)), now, &zone),
            DueState::Overdue
        );
        // 00:15 local on March 11 is tomorrow, not today.
        assert_eq!(
            due_state_in(Some(now + Duration::minutes(45)), now, &zone),
            DueState::DueTomorrow
        );
        assert_eq!(
            due_state_in(Some(now - Duration::hours(20)), now, &zone),
            DueState::DueToday
        );
        assert_eq!(
            due_state_in(Some(now + Duration::days(3)), now, &zone),
            DueState::Normal
        );
    }
}
