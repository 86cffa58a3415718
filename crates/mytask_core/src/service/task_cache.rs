//! Per-project task list cache with a freshness window.
//!
//! # Invariants
//! - An entry is served only while `now - fetched_at < freshness`.
//! - Write-through edits keep the original `fetched_at`; only a backend
//!   fetch renews an entry.
//! - Nothing is persisted.

use crate::model::project::ProjectId;
use crate::model::task::Task;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Snapshot of one project's task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub tasks: Vec<Task>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < freshness
    }
}

#[derive(Debug, Clone)]
pub struct TaskCache {
    entries: HashMap<ProjectId, CacheEntry>,
    freshness: Duration,
}

impl TaskCache {
    pub fn new(freshness: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            freshness,
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Returns the cached list when the entry is still fresh.
    pub fn fresh(&self, project_id: &str, now: DateTime<Utc>) -> Option<&[Task]> {
        self.entries
            .get(project_id)
            .filter(|entry| entry.is_fresh(now, self.freshness))
            .map(|entry| entry.tasks.as_slice())
    }

    /// Stores a freshly fetched list.
    pub fn store(&mut self, project_id: impl Into<ProjectId>, tasks: Vec<Task>, now: DateTime<Utc>) {
        self.entries.insert(
            project_id.into(),
            CacheEntry {
                tasks,
                fetched_at: now,
            },
        );
    }

    /// Applies a local edit to an existing entry. Absent entries stay absent.
    pub fn edit(&mut self, project_id: &str, apply: impl FnOnce(&mut Vec<Task>)) {
        if let Some(entry) = self.entries.get_mut(project_id) {
            apply(&mut entry.tasks);
        }
    }

    /// Drops a task from whichever snapshot holds it.
    pub fn forget_task(&mut self, task_id: &str) {
        for entry in self.entries.values_mut() {
            entry.tasks.retain(|task| task.id != task_id);
        }
    }

    pub fn invalidate(&mut self, project_id: &str) {
        self.entries.remove(project_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entry(&self, project_id: &str) -> Option<&CacheEntry> {
        self.entries.get(project_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
