//! Notification seam between task mutations and outbound delivery.

use crate::model::task::Task;
use chrono::{DateTime, Utc};

/// Result of one delivery attempt. Failures are values, never panics or
/// propagated errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub message_id: Option<String>,
}

impl DispatchOutcome {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            message_id: Some(message_id.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message_id: None,
        }
    }
}

/// Best-effort task notifications addressed to one user.
pub trait TaskNotifier: Send + Sync {
    fn task_created(&self, user_id: &str, task: &Task, project_name: &str) -> DispatchOutcome;
    fn task_completed(&self, user_id: &str, task: &Task, project_name: &str) -> DispatchOutcome;
    fn task_due_soon(
        &self,
        user_id: &str,
        task: &Task,
        project_name: &str,
        due_date: DateTime<Utc>,
    ) -> DispatchOutcome;
}

/// Notifier that drops every message. Used when delivery is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl TaskNotifier for NoopNotifier {
    fn task_created(&self, _user_id: &str, _task: &Task, _project_name: &str) -> DispatchOutcome {
        DispatchOutcome::failed("notifications are disabled")
    }

    fn task_completed(&self, _user_id: &str, _task: &Task, _project_name: &str) -> DispatchOutcome {
        DispatchOutcome::failed("notifications are disabled")
    }

    fn task_due_soon(
        &self,
        _user_id: &str,
        _task: &Task,
        _project_name: &str,
        _due_date: DateTime<Utc>,
    ) -> DispatchOutcome {
        DispatchOutcome::failed("notifications are disabled")
    }
}
