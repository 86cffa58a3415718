//! Backend contracts and the local SQLite implementation.
//!
//! # Responsibility
//! - Define the operations the client core needs from its backend: identity,
//!   profiles, projects, tasks, notifications and SMS audit logs.
//! - Keep transport and SQL details behind these traits so services can be
//!   handed any backend (SQLite, hosted REST, or a test fake).
//!
//! # Invariants
//! - List queries exclude archived rows and return newest-first.
//! - Mutations return the row as persisted by the backend.
//! - Missing rows on update/delete surface as `RepoError::NotFound`.

use crate::db::DbError;
use crate::model::notification::{NewNotification, Notification, SmsLogEntry};
use crate::model::project::{NewProject, Project, ProjectPatch};
use crate::model::task::{NewTask, Task, TaskPatch};
use crate::model::user::{AuthIdentity, SignUpProfile, User, UserId};
use crate::model::validation::ValidationError;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod auth_repo;
pub mod notification_repo;
pub mod project_repo;
pub mod sqlite_backend;
pub mod task_repo;

pub use sqlite_backend::SqliteBackend;

pub type RepoResult<T> = Result<T, RepoError>;

/// Failure of a backend data call, transport or semantic.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Transport(String),
    Status { code: u16, message: String },
    Unauthorized,
    NotFound { entity: &'static str, id: String },
    InvalidData(String),
    Validation(ValidationError),
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Transport(message) => write!(f, "backend unreachable: {message}"),
            Self::Status { code, message } => write!(f, "backend returned {code}: {message}"),
            Self::Unauthorized => write!(f, "backend rejected the request credentials"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid backend data: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Failure of an identity-service call.
#[derive(Debug)]
pub enum AuthError {
    /// No session is active. Expected on a fresh start, not a fault.
    SessionMissing,
    InvalidCredentials,
    EmailAlreadyRegistered(String),
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionMissing => write!(f, "no active session"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::EmailAlreadyRegistered(email) => {
                write!(f, "an account already exists for {email}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Unauthorized => Self::InvalidCredentials,
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Identity service: credentials and the active session.
pub trait AuthGateway: Send + Sync {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> Result<AuthIdentity, AuthError>;
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;
    fn sign_out(&self) -> Result<(), AuthError>;
    /// Resolves the identity behind the active session.
    fn current_identity(&self) -> Result<AuthIdentity, AuthError>;
}

/// Application profile rows (`users` table).
pub trait UserRepository: Send + Sync {
    fn get_user(&self, id: &str) -> RepoResult<Option<User>>;
    fn insert_user(&self, user: &User) -> RepoResult<User>;
}

pub trait ProjectRepository: Send + Sync {
    /// Non-archived projects of `owner_id`, newest first.
    fn list_projects(&self, owner_id: &str) -> RepoResult<Vec<Project>>;
    fn get_project(&self, id: &str) -> RepoResult<Option<Project>>;
    fn create_project(&self, project: &NewProject) -> RepoResult<Project>;
    fn update_project(&self, id: &str, patch: &ProjectPatch) -> RepoResult<Project>;
    fn delete_project(&self, id: &str) -> RepoResult<()>;
}

/// Filter for the reminder query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueTaskQuery {
    pub assignee: UserId,
    /// Inclusive lower bound on `due_date`.
    pub due_from: DateTime<Utc>,
    /// Inclusive upper bound on `due_date`.
    pub due_until: DateTime<Utc>,
}

pub trait TaskRepository: Send + Sync {
    /// Non-archived tasks of `project_id`, newest first.
    fn list_tasks(&self, project_id: &str) -> RepoResult<Vec<Task>>;
    fn get_task(&self, id: &str) -> RepoResult<Option<Task>>;
    fn create_task(&self, task: &NewTask) -> RepoResult<Task>;
    fn update_task(&self, id: &str, patch: &TaskPatch) -> RepoResult<Task>;
    fn delete_task(&self, id: &str) -> RepoResult<()>;
    /// Deletes every task of a project, archived or not. Returns the count.
    fn delete_tasks_for_project(&self, project_id: &str) -> RepoResult<usize>;
    /// Non-archived, not-Done tasks assigned to `query.assignee` and due
    /// inside the query window, earliest due first.
    fn list_due_tasks(&self, query: &DueTaskQuery) -> RepoResult<Vec<Task>>;
}

pub trait NotificationRepository: Send + Sync {
    /// Notifications of one user, newest first.
    fn list_notifications(&self, user_id: &str) -> RepoResult<Vec<Notification>>;
    fn create_notification(&self, notification: &NewNotification) -> RepoResult<Notification>;
    fn mark_notification_read(&self, id: &str) -> RepoResult<Notification>;
    fn delete_notification(&self, id: &str) -> RepoResult<()>;
}

pub trait SmsLogRepository: Send + Sync {
    fn insert_sms_log(&self, entry: &SmsLogEntry) -> RepoResult<()>;
    /// Most recent audit rows, newest first.
    fn list_sms_logs(&self, limit: u32) -> RepoResult<Vec<SmsLogEntry>>;
}

/// Everything the client core needs from one backend.
pub trait Backend:
    AuthGateway
    + UserRepository
    + ProjectRepository
    + TaskRepository
    + NotificationRepository
    + SmsLogRepository
{
}

impl<T> Backend for T where
    T: AuthGateway
        + UserRepository
        + ProjectRepository
        + TaskRepository
        + NotificationRepository
        + SmsLogRepository
{
}
