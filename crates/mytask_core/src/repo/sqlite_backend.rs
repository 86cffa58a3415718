//! Local SQLite backend.
//!
//! # Responsibility
//! - Implement every backend contract over one SQLite connection, standing in
//!   for the hosted service in the CLI and in tests.
//! - Hold the client-side session token the way a hosted SDK would.
//!
//! # Invariants
//! - Timestamps are stored as Unix epoch milliseconds.
//! - Booleans are stored as `0`/`1` and rejected otherwise on read.
//! - The connection is only touched while its mutex is held.

use crate::db::{open_db, open_db_in_memory};
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Backend implementation over a single SQLite database.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    session_token: Mutex<Option<String>>,
}

impl SqliteBackend {
    /// Opens (or creates) a database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            session_token: Mutex::new(None),
        }
    }

    /// Returns the active session token, if any.
    pub fn session_token(&self) -> Option<String> {
        self.token_slot().clone()
    }

    /// Restores a session token persisted by the caller.
    ///
    /// The token is only validated on the next `current_identity` call.
    pub fn resume_session(&self, token: impl Into<String>) {
        *self.token_slot() = Some(token.into());
    }

    pub(crate) fn token_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.session_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with_conn<T>(
        &self,
        work: impl FnOnce(&mut Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        work(&mut conn)
    }
}

pub(crate) fn new_row_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn to_epoch_ms(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub(crate) fn from_epoch_ms(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp `{value}` out of range in {column}"))
    })
}

pub(crate) fn opt_from_epoch_ms(
    value: Option<i64>,
    column: &str,
) -> RepoResult<Option<DateTime<Utc>>> {
    value.map(|ms| from_epoch_ms(ms, column)).transpose()
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
