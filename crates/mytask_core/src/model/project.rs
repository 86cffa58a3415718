//! Project model.
//!
//! # Invariants
//! - A project is owned by exactly one user (`owner_id`).
//! - Ownership checks are enforced by the backend, not by this model.

use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProjectId = String;

/// Persisted project row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_archived: bool,
}

/// Insert request for a project; the backend assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub is_archived: bool,
}

impl NewProject {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        owner_id: impl Into<UserId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            owner_id: owner_id.into(),
            created_at,
            is_archived: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankProjectName);
        }
        Ok(())
    }
}

/// Partial update for a project. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_archived.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ValidationError::BlankProjectName);
        }
        Ok(())
    }

    /// Applies this patch on top of an existing project.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(is_archived) = self.is_archived {
            project.is_archived = is_archived;
        }
    }
}
