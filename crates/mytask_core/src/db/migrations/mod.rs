//! Ordered schema steps for the local backend.
//!
//! Each step runs in its own transaction together with the `user_version`
//! bump, so an interrupted upgrade resumes from the last committed step.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};

/// `(version, sql)` pairs, strictly increasing.
const STEPS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Newest schema version this build can read and write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _)| *version)
}

/// Schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings `conn` up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<_> = STEPS.iter().filter(|(version, _)| *version > found).collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=skip version={}", found);
        return Ok(());
    }

    for (version, sql) in pending {
        let version = *version;
        let step = |conn: &mut Connection| -> rusqlite::Result<()> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()
        };
        step(conn).map_err(|source| DbError::Migration { version, source })?;
        info!("event=db_migrate module=db status=ok version={}", version);
    }
    Ok(())
}
