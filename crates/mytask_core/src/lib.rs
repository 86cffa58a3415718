//! Client core for MyTask, a kanban task manager.
//! Session, project/task state, board projection, reminders and SMS
//! notifications over an injected backend.

pub mod app;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;

pub use app::MyTaskApp;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, BackendLocation, ConfigError, DeliveryMode};
pub use logging::{
    active_logging, default_log_level, init_logging, LogSettings, LogTarget, LoggingError,
};
pub use model::notification::{Notification, SmsDeliveryStatus, SmsLogEntry};
pub use model::project::{NewProject, Project, ProjectPatch};
pub use model::task::{NewTask, Task, TaskPatch, TaskStatus};
pub use model::user::User;
pub use remote::RestBackend;
pub use repo::{AuthError, Backend, RepoError, RepoResult, SqliteBackend};
pub use service::kanban::{DueState, KanbanBoard};
pub use service::notifier::{DispatchOutcome, TaskNotifier};
pub use service::project_store::{ProjectStore, StoreEvent};
pub use service::session::{AuthOutcome, BootstrapOutcome, SessionManager};
