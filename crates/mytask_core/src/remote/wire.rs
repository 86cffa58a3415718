//! Request filters and response decoding for the hosted backend.

use crate::model::task::{Task, TaskStatus};
use crate::repo::RepoError;
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::Deserialize;
use ureq::Request;

/// Query-string filters for a table endpoint.
///
/// Values are passed through `Request::query`, which percent-encodes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pairs: Vec<(String, String)>,
}

impl TableQuery {
    /// Starts a query selecting every column.
    pub fn select_all() -> Self {
        Self::default().param("select", "*")
    }

    /// Filters without a column projection (writes and deletes).
    pub fn filter() -> Self {
        Self::default()
    }

    pub fn eq(self, column: &str, value: impl AsRef<str>) -> Self {
        self.op(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl AsRef<str>) -> Self {
        self.op(column, "neq", value)
    }

    pub fn gte(self, column: &str, value: impl AsRef<str>) -> Self {
        self.op(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl AsRef<str>) -> Self {
        self.op(column, "lte", value)
    }

    pub fn order_desc(self, column: &str) -> Self {
        self.param("order", &format!("{column}.desc"))
    }

    pub fn order_asc(self, column: &str) -> Self {
        self.param("order", &format!("{column}.asc"))
    }

    pub fn limit(self, limit: u32) -> Self {
        self.param("limit", &limit.to_string())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub(crate) fn apply(&self, request: Request) -> Request {
        self.pairs
            .iter()
            .fold(request, |request, (key, value)| request.query(key, value))
    }

    fn op(self, column: &str, op: &str, value: impl AsRef<str>) -> Self {
        self.param(column, &format!("{op}.{}", value.as_ref()))
    }

    fn param(mut self, key: &str, value: &str) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }
}

/// Error body shapes returned by the auth and table endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extracts the human-readable part of an error body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_string())
}

pub(crate) fn status_error(code: u16, body: &str) -> RepoError {
    match code {
        401 | 403 => RepoError::Unauthorized,
        _ => RepoError::Status {
            code,
            message: error_message(body),
        },
    }
}

/// Task row as served by the table endpoint.
///
/// `status` and `due_date` are decoded leniently so one malformed row does
/// not fail the whole list.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskRow {
    id: String,
    project_id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    assigned_to: Option<String>,
    #[serde(default)]
    is_archived: Option<bool>,
}

impl TaskRow {
    pub(crate) fn into_task(self) -> Result<Task, String> {
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown status `{}`", self.status))?;
        let due_date = match self.due_date.as_deref() {
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| format!("bad due_date `{raw}`"))?),
            None => None,
        };
        Ok(Task {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            status,
            created_at: self.created_at,
            due_date,
            assigned_to: self.assigned_to,
            is_archived: self.is_archived.unwrap_or(false),
        })
    }
}

/// Converts rows into tasks, dropping rows that do not decode.
pub(crate) fn decode_task_rows(rows: Vec<TaskRow>) -> Vec<Task> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match row.into_task() {
                Ok(task) => Some(task),
                Err(reason) => {
                    warn!(
                        "event=task_row_skipped module=remote status=skip task_id={} reason={}",
                        id, reason
                    );
                    None
                }
            }
        })
        .collect()
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn timestamp_filter(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// User object returned by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthUserBody {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

/// Token grant or sign-up response.
///
/// Sign-up returns either a full session or, when email confirmation is
/// pending, the bare user object.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionBody {
    #[serde(default)]
    pub(crate) access_token: Option<String>,
    #[serde(default)]
    pub(crate) user: Option<AuthUserBody>,
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

impl SessionBody {
    pub(crate) fn user(&self) -> Option<AuthUserBody> {
        self.user.clone().or_else(|| {
            self.id.clone().map(|id| AuthUserBody {
                id,
                email: self.email.clone(),
            })
        })
    }
}
