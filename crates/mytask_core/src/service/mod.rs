//! Client-side state objects and side-effect services.
//!
//! # Responsibility
//! - Hold the session, project/task and notification state the UI renders.
//! - Derive the kanban board and drive drag interactions.
//! - Deliver reminders and SMS notifications without failing callers.

pub mod drag;
pub mod events;
pub mod kanban;
pub mod notification_center;
pub mod notifier;
pub mod project_store;
pub mod reminder;
pub mod session;
pub mod sms_dispatcher;
pub mod sms_provider;
pub mod task_cache;
