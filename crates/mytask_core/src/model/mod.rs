//! Domain model for users, projects, tasks and notifications.
//!
//! # Responsibility
//! - Define canonical records exchanged with the backend.
//! - Define create requests and partial-update patches per entity.
//!
//! # Invariants
//! - Every record is identified by an opaque, backend-assigned string id.
//! - Task status is always one of `To Do`, `Doing`, `Done`.
//! - Archived rows stay in storage and are filtered out of list queries.

pub mod notification;
pub mod project;
pub mod task;
pub mod user;
pub mod validation;
