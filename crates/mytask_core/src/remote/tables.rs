//! Table endpoints: projects, tasks, notifications, sms_logs.

use crate::model::notification::{NewNotification, Notification, SmsLogEntry};
use crate::model::project::{NewProject, Project, ProjectPatch};
use crate::model::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::remote::wire::{decode_task_rows, timestamp_filter, TaskRow};
use crate::remote::{RestBackend, TableQuery};
use crate::repo::{
    DueTaskQuery, NotificationRepository, ProjectRepository, RepoError, RepoResult,
    SmsLogRepository, TaskRepository,
};
use serde_json::json;

const PROJECTS: &str = "projects";
const TASKS: &str = "tasks";
const NOTIFICATIONS: &str = "notifications";
const SMS_LOGS: &str = "sms_logs";

fn first_row<T>(rows: Vec<T>, entity: &'static str, id: &str) -> RepoResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| RepoError::not_found(entity, id))
}

fn by_id(id: &str) -> TableQuery {
    TableQuery::filter().eq("id", id)
}

impl ProjectRepository for RestBackend {
    fn list_projects(&self, owner_id: &str) -> RepoResult<Vec<Project>> {
        self.select(
            PROJECTS,
            &TableQuery::select_all()
                .eq("owner_id", owner_id)
                .eq("is_archived", "false")
                .order_desc("created_at"),
        )
    }

    fn get_project(&self, id: &str) -> RepoResult<Option<Project>> {
        let rows: Vec<Project> = self.select(PROJECTS, &TableQuery::select_all().eq("id", id))?;
        Ok(rows.into_iter().next())
    }

    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        project.validate()?;
        let rows = self.insert(PROJECTS, project)?;
        first_row(rows, "project", "<new>")
    }

    fn update_project(&self, id: &str, patch: &ProjectPatch) -> RepoResult<Project> {
        patch.validate()?;
        let rows = self.update(PROJECTS, &by_id(id), patch)?;
        first_row(rows, "project", id)
    }

    fn delete_project(&self, id: &str) -> RepoResult<()> {
        let rows: Vec<serde_json::Value> = self.delete(PROJECTS, &by_id(id))?;
        first_row(rows, "project", id).map(|_| ())
    }
}

impl TaskRepository for RestBackend {
    fn list_tasks(&self, project_id: &str) -> RepoResult<Vec<Task>> {
        let rows: Vec<TaskRow> = self.select(
            TASKS,
            &TableQuery::select_all()
                .eq("project_id", project_id)
                .eq("is_archived", "false")
                .order_desc("created_at"),
        )?;
        Ok(decode_task_rows(rows))
    }

    fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        let rows: Vec<TaskRow> = self.select(TASKS, &TableQuery::select_all().eq("id", id))?;
        rows.into_iter()
            .next()
            .map(|row| row.into_task().map_err(RepoError::InvalidData))
            .transpose()
    }

    fn create_task(&self, task: &NewTask) -> RepoResult<Task> {
        task.validate()?;
        let rows: Vec<TaskRow> = self.insert(TASKS, task)?;
        first_row(rows, "task", "<new>")?
            .into_task()
            .map_err(RepoError::InvalidData)
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> RepoResult<Task> {
        patch.validate()?;
        let rows: Vec<TaskRow> = self.update(TASKS, &by_id(id), patch)?;
        first_row(rows, "task", id)?
            .into_task()
            .map_err(RepoError::InvalidData)
    }

    fn delete_task(&self, id: &str) -> RepoResult<()> {
        let rows: Vec<serde_json::Value> = self.delete(TASKS, &by_id(id))?;
        first_row(rows, "task", id).map(|_| ())
    }

    fn delete_tasks_for_project(&self, project_id: &str) -> RepoResult<usize> {
        let rows: Vec<serde_json::Value> =
            self.delete(TASKS, &TableQuery::filter().eq("project_id", project_id))?;
        Ok(rows.len())
    }

    fn list_due_tasks(&self, query: &DueTaskQuery) -> RepoResult<Vec<Task>> {
        let rows: Vec<TaskRow> = self.select(
            TASKS,
            &TableQuery::select_all()
                .eq("assigned_to", &query.assignee)
                .neq("status", TaskStatus::Done.as_str())
                .eq("is_archived", "false")
                .gte("due_date", timestamp_filter(query.due_from))
                .lte("due_date", timestamp_filter(query.due_until))
                .order_asc("due_date"),
        )?;
        Ok(decode_task_rows(rows))
    }
}

impl NotificationRepository for RestBackend {
    fn list_notifications(&self, user_id: &str) -> RepoResult<Vec<Notification>> {
        self.select(
            NOTIFICATIONS,
            &TableQuery::select_all()
                .eq("user_id", user_id)
                .order_desc("created_at"),
        )
    }

    fn create_notification(&self, notification: &NewNotification) -> RepoResult<Notification> {
        let rows = self.insert(NOTIFICATIONS, notification)?;
        first_row(rows, "notification", "<new>")
    }

    fn mark_notification_read(&self, id: &str) -> RepoResult<Notification> {
        let rows = self.update(NOTIFICATIONS, &by_id(id), &json!({ "read": true }))?;
        first_row(rows, "notification", id)
    }

    fn delete_notification(&self, id: &str) -> RepoResult<()> {
        let rows: Vec<serde_json::Value> = self.delete(NOTIFICATIONS, &by_id(id))?;
        first_row(rows, "notification", id).map(|_| ())
    }
}

impl SmsLogRepository for RestBackend {
    fn insert_sms_log(&self, entry: &SmsLogEntry) -> RepoResult<()> {
        self.insert_minimal(SMS_LOGS, entry)
    }

    fn list_sms_logs(&self, limit: u32) -> RepoResult<Vec<SmsLogEntry>> {
        self.select(
            SMS_LOGS,
            &TableQuery::select_all().order_desc("created_at").limit(limit),
        )
    }
}
