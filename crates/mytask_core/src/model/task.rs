//! Task model.
//!
//! # Responsibility
//! - Define the task record rendered by the kanban board.
//! - Define the finite status set and its wire spelling.
//!
//! # Invariants
//! - `status` is one of the three kanban columns; the wire values are
//!   `"To Do"`, `"Doing"` and `"Done"`.
//! - A task belongs to exactly one project (`project_id`).

use crate::model::project::ProjectId;
use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type TaskId = String;

/// Kanban column a task currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    Todo,
    #[serde(rename = "Doing")]
    Doing,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// Board column order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::Doing, TaskStatus::Done];

    /// Wire/storage spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::Doing => "Doing",
            Self::Done => "Done",
        }
    }

    /// Parses the exact wire spelling. Anything else is unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "To Do" => Some(Self::Todo),
            "Doing" => Some(Self::Doing),
            "Done" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn is_done(self) -> bool {
        self == Self::Done
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub is_archived: bool,
}

/// Insert request for a task; the backend assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<UserId>,
    pub is_archived: bool,
}

impl NewTask {
    /// Creates a `To Do` task request with no due date and no assignee.
    pub fn new(
        project_id: impl Into<ProjectId>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            created_at,
            due_date: None,
            assigned_to: None,
            is_archived: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn assigned_to(mut self, user_id: impl Into<UserId>) -> Self {
        self.assigned_to = Some(user_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTaskTitle);
        }
        Ok(())
    }
}

/// Partial update for a task. `None` fields are left untouched.
///
/// `due_date` and `assigned_to` are double options: `Some(None)` clears the
/// value and serializes as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<UserId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

impl TaskPatch {
    /// Patch that only changes the status column.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
            && self.is_archived.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(ValidationError::BlankTaskTitle);
        }
        Ok(())
    }

    /// Applies this patch on top of an existing task.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to = assigned_to.clone();
        }
        if let Some(is_archived) = self.is_archived {
            task.is_archived = is_archived;
        }
    }
}
