#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use mytask_core::model::notification::{NewNotification, Notification, SmsLogEntry};
use mytask_core::model::user::{AuthIdentity, SignUpProfile, User};
use mytask_core::repo::{
    AuthGateway, DueTaskQuery, NotificationRepository, ProjectRepository, SmsLogRepository,
    TaskRepository, UserRepository,
};
use mytask_core::{
    AuthError, DispatchOutcome, NewProject, NewTask, Project, ProjectPatch, RepoError, RepoResult,
    SqliteBackend, Task, TaskNotifier, TaskPatch,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub kind: &'static str,
    pub user_id: String,
    pub task_title: String,
    pub project_name: String,
}

/// Notifier that records every attempt. Succeeds unless built with
/// `failing()`.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.sent().iter().filter(|sent| sent.kind == kind).count()
    }

    fn record(&self, kind: &'static str, user_id: &str, task: &Task, project_name: &str) -> DispatchOutcome {
        self.sent.lock().unwrap().push(Sent {
            kind,
            user_id: user_id.to_string(),
            task_title: task.title.clone(),
            project_name: project_name.to_string(),
        });
        if self.fail {
            return DispatchOutcome::failed("SMS delivery is not configured");
        }
        DispatchOutcome::sent(format!("SM{}", self.sent.lock().unwrap().len()))
    }
}

impl TaskNotifier for RecordingNotifier {
    fn task_created(&self, user_id: &str, task: &Task, project_name: &str) -> DispatchOutcome {
        self.record("created", user_id, task, project_name)
    }

    fn task_completed(&self, user_id: &str, task: &Task, project_name: &str) -> DispatchOutcome {
        self.record("completed", user_id, task, project_name)
    }

    fn task_due_soon(
        &self,
        user_id: &str,
        task: &Task,
        project_name: &str,
        _due_date: DateTime<Utc>,
    ) -> DispatchOutcome {
        self.record("due_soon", user_id, task, project_name)
    }
}

/// SQLite backend with call counters and injectable faults.
pub struct CountingBackend {
    pub inner: SqliteBackend,
    pub list_tasks_calls: AtomicUsize,
    pub update_task_calls: AtomicUsize,
    pub fail_task_writes: AtomicBool,
    pub fail_task_reads: AtomicBool,
    pub fail_project_deletes: AtomicBool,
    pub fail_profile_writes: AtomicBool,
    pub identity_delay: Mutex<Duration>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self {
            inner: SqliteBackend::open_in_memory().unwrap(),
            list_tasks_calls: AtomicUsize::new(0),
            update_task_calls: AtomicUsize::new(0),
            fail_task_writes: AtomicBool::new(false),
            fail_task_reads: AtomicBool::new(false),
            fail_project_deletes: AtomicBool::new(false),
            fail_profile_writes: AtomicBool::new(false),
            identity_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn list_tasks_calls(&self) -> usize {
        self.list_tasks_calls.load(Ordering::SeqCst)
    }

    pub fn update_task_calls(&self) -> usize {
        self.update_task_calls.load(Ordering::SeqCst)
    }

    fn check_task_write(&self) -> RepoResult<()> {
        if self.fail_task_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

impl AuthGateway for CountingBackend {
    fn sign_up(&self, email: &str, password: &str, profile: &SignUpProfile) -> Result<AuthIdentity, AuthError> {
        self.inner.sign_up(email, password, profile)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        self.inner.sign_in(email, password)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.sign_out()
    }

    fn current_identity(&self) -> Result<AuthIdentity, AuthError> {
        let delay = *self.identity_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.inner.current_identity()
    }
}

impl UserRepository for CountingBackend {
    fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        self.inner.get_user(id)
    }

    fn insert_user(&self, user: &User) -> RepoResult<User> {
        if self.fail_profile_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Status {
                code: 403,
                message: "row-level security policy".to_string(),
            });
        }
        self.inner.insert_user(user)
    }
}

impl ProjectRepository for CountingBackend {
    fn list_projects(&self, owner_id: &str) -> RepoResult<Vec<Project>> {
        self.inner.list_projects(owner_id)
    }

    fn get_project(&self, id: &str) -> RepoResult<Option<Project>> {
        self.inner.get_project(id)
    }

    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        self.inner.create_project(project)
    }

    fn update_project(&self, id: &str, patch: &ProjectPatch) -> RepoResult<Project> {
        self.inner.update_project(id, patch)
    }

    fn delete_project(&self, id: &str) -> RepoResult<()> {
        if self.fail_project_deletes.load(Ordering::SeqCst) {
            return Err(RepoError::Transport("connection reset".to_string()));
        }
        self.inner.delete_project(id)
    }
}

impl TaskRepository for CountingBackend {
    fn list_tasks(&self, project_id: &str) -> RepoResult<Vec<Task>> {
        self.list_tasks_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_task_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Transport("connection reset".to_string()));
        }
        self.inner.list_tasks(project_id)
    }

    fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        self.inner.get_task(id)
    }

    fn create_task(&self, task: &NewTask) -> RepoResult<Task> {
        self.check_task_write()?;
        self.inner.create_task(task)
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> RepoResult<Task> {
        self.update_task_calls.fetch_add(1, Ordering::SeqCst);
        self.check_task_write()?;
        self.inner.update_task(id, patch)
    }

    fn delete_task(&self, id: &str) -> RepoResult<()> {
        self.check_task_write()?;
        self.inner.delete_task(id)
    }

    fn delete_tasks_for_project(&self, project_id: &str) -> RepoResult<usize> {
        self.check_task_write()?;
        self.inner.delete_tasks_for_project(project_id)
    }

    fn list_due_tasks(&self, query: &DueTaskQuery) -> RepoResult<Vec<Task>> {
        self.inner.list_due_tasks(query)
    }
}

impl NotificationRepository for CountingBackend {
    fn list_notifications(&self, user_id: &str) -> RepoResult<Vec<Notification>> {
        self.inner.list_notifications(user_id)
    }

    fn create_notification(&self, notification: &NewNotification) -> RepoResult<Notification> {
        self.inner.create_notification(notification)
    }

    fn mark_notification_read(&self, id: &str) -> RepoResult<Notification> {
        self.inner.mark_notification_read(id)
    }

    fn delete_notification(&self, id: &str) -> RepoResult<()> {
        self.inner.delete_notification(id)
    }
}

impl SmsLogRepository for CountingBackend {
    fn insert_sms_log(&self, entry: &SmsLogEntry) -> RepoResult<()> {
        self.inner.insert_sms_log(entry)
    }

    fn list_sms_logs(&self, limit: u32) -> RepoResult<Vec<SmsLogEntry>> {
        self.inner.list_sms_logs(limit)
    }
}
