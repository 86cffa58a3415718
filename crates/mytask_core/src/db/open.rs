//! Connection setup shared by file and in-memory databases.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) a database file and its parent directory.
///
/// File databases use WAL so a CLI run and a long-lived client can share one
/// file.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| DbError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let mut conn = Connection::open(path)?;
    let journal: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !journal.eq_ignore_ascii_case("wal") {
        warn!("event=db_open module=db status=skip reason=wal_unavailable journal={journal}");
    }
    prepare(&mut conn, "file")?;
    Ok(conn)
}

/// Opens a private in-memory database with the full schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    prepare(&mut conn, "memory")?;
    Ok(conn)
}

fn prepare(conn: &mut Connection, mode: &'static str) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn).inspect_err(|err| {
        warn!("event=db_open module=db status=error mode={mode} error={err}");
    })?;
    info!("event=db_open module=db status=ok mode={mode}");
    Ok(())
}
