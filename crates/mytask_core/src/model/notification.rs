//! In-app notification and SMS delivery-log records.

use crate::model::project::ProjectId;
use crate::model::task::TaskId;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type NotificationId = String;

/// In-app notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub related_task_id: Option<TaskId>,
    #[serde(default)]
    pub related_project_id: Option<ProjectId>,
}

/// Insert request for a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNotification {
    pub user_id: UserId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub related_task_id: Option<TaskId>,
    pub related_project_id: Option<ProjectId>,
}

impl NewNotification {
    pub fn new(user_id: impl Into<UserId>, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            read: false,
            created_at: now,
            related_task_id: None,
            related_project_id: None,
        }
    }
}

/// Outcome recorded for one outbound SMS attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsDeliveryStatus {
    Sent,
    Failed,
}

impl SmsDeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Audit row for one SMS attempt, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsLogEntry {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub phone_number: String,
    pub message: String,
    pub status: SmsDeliveryStatus,
    #[serde(default)]
    pub provider_message_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
