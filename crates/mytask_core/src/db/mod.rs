//! Local storage for `SqliteBackend`.
//!
//! # Responsibility
//! - Open database files (creating their directory) or in-memory databases.
//! - Bring the schema to the version this build expects.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A connection is handed out only after every migration step committed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The database directory could not be created.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
    /// One migration step failed and was rolled back.
    Migration { version: u32, source: rusqlite::Error },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Io { path, source } => {
                write!(f, "cannot prepare database directory {}: {source}", path.display())
            }
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "database schema {found} was written by a newer version (this build supports up to {supported})"
            ),
            Self::Migration { version, source } => {
                write!(f, "schema migration {version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
