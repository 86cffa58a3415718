//! Notification and SMS audit persistence for the SQLite backend.

use crate::model::notification::{
    NewNotification, Notification, SmsDeliveryStatus, SmsLogEntry,
};
use crate::repo::sqlite_backend::{
    bool_to_int, from_epoch_ms, int_to_bool, new_row_id, to_epoch_ms, SqliteBackend,
};
use crate::repo::{NotificationRepository, RepoError, RepoResult, SmsLogRepository};
use rusqlite::{params, Connection, Row};

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    message,
    read,
    created_at,
    related_task_id,
    related_project_id
FROM notifications";

impl NotificationRepository for SqliteBackend {
    fn list_notifications(&self, user_id: &str) -> RepoResult<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{NOTIFICATION_SELECT_SQL}
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC;"
            ))?;
            let mut rows = stmt.query([user_id])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(parse_notification_row(row)?);
            }
            Ok(items)
        })
    }

    fn create_notification(&self, notification: &NewNotification) -> RepoResult<Notification> {
        let id = new_row_id();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (
                    id,
                    user_id,
                    message,
                    read,
                    created_at,
                    related_task_id,
                    related_project_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    id,
                    notification.user_id,
                    notification.message,
                    bool_to_int(notification.read),
                    to_epoch_ms(notification.created_at),
                    notification.related_task_id,
                    notification.related_project_id,
                ],
            )?;
            load_notification(conn, &id)?
                .ok_or_else(|| RepoError::not_found("notification", id.as_str()))
        })
    }

    fn mark_notification_read(&self, id: &str) -> RepoResult<Notification> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE notifications SET read = 1 WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found("notification", id));
            }
            load_notification(conn, id)?.ok_or_else(|| RepoError::not_found("notification", id))
        })
    }

    fn delete_notification(&self, id: &str) -> RepoResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM notifications WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found("notification", id));
            }
            Ok(())
        })
    }
}

impl SmsLogRepository for SqliteBackend {
    fn insert_sms_log(&self, entry: &SmsLogEntry) -> RepoResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sms_logs (
                    user_id,
                    phone_number,
                    message,
                    status,
                    provider_message_id,
                    error,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    entry.user_id,
                    entry.phone_number,
                    entry.message,
                    entry.status.as_str(),
                    entry.provider_message_id,
                    entry.error,
                    to_epoch_ms(entry.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn list_sms_logs(&self, limit: u32) -> RepoResult<Vec<SmsLogEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, phone_number, message, status, provider_message_id, error, created_at
                 FROM sms_logs
                 ORDER BY id DESC
                 LIMIT ?1;",
            )?;
            let mut rows = stmt.query([i64::from(limit)])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(parse_sms_log_row(row)?);
            }
            Ok(entries)
        })
    }
}

fn load_notification(conn: &Connection, id: &str) -> RepoResult<Option<Notification>> {
    let mut stmt = conn.prepare(&format!("{NOTIFICATION_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_notification_row(row)?)),
        None => Ok(None),
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    Ok(Notification {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        message: row.get("message")?,
        read: int_to_bool(row.get("read")?, "notifications.read")?,
        created_at: from_epoch_ms(row.get("created_at")?, "notifications.created_at")?,
        related_task_id: row.get("related_task_id")?,
        related_project_id: row.get("related_project_id")?,
    })
}

fn parse_sms_log_row(row: &Row<'_>) -> RepoResult<SmsLogEntry> {
    let status_text: String = row.get("status")?;
    let status = SmsDeliveryStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid sms status `{status_text}` in sms_logs.status"))
    })?;
    Ok(SmsLogEntry {
        user_id: row.get("user_id")?,
        phone_number: row.get("phone_number")?,
        message: row.get("message")?,
        status,
        provider_message_id: row.get("provider_message_id")?,
        error: row.get("error")?,
        created_at: from_epoch_ms(row.get("created_at")?, "sms_logs.created_at")?,
    })
}
