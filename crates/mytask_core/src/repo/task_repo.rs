//! Task persistence for the SQLite backend.
//!
//! # Invariants
//! - List reads skip rows whose `status` is not a known column value and log
//!   a warning; single-row reads reject them as invalid data.

use crate::model::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::repo::sqlite_backend::{
    bool_to_int, from_epoch_ms, int_to_bool, new_row_id, opt_from_epoch_ms, to_epoch_ms,
    SqliteBackend,
};
use crate::repo::{DueTaskQuery, RepoError, RepoResult, TaskRepository};
use log::warn;
use rusqlite::{params, Connection, Params, Row};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    title,
    description,
    status,
    created_at,
    due_date,
    assigned_to,
    is_archived
FROM tasks";

impl TaskRepository for SqliteBackend {
    fn list_tasks(&self, project_id: &str) -> RepoResult<Vec<Task>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE project_id = ?1 AND is_archived = 0
                     ORDER BY created_at DESC, rowid DESC;"
                ),
                [project_id],
            )
        })
    }

    fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        self.with_conn(|conn| load_task(conn, id))
    }

    fn create_task(&self, task: &NewTask) -> RepoResult<Task> {
        task.validate()?;
        let id = new_row_id();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    id,
                    project_id,
                    title,
                    description,
                    status,
                    created_at,
                    due_date,
                    assigned_to,
                    is_archived
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    id,
                    task.project_id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    to_epoch_ms(task.created_at),
                    task.due_date.map(to_epoch_ms),
                    task.assigned_to,
                    bool_to_int(task.is_archived),
                ],
            )?;
            load_task(conn, &id)?.ok_or_else(|| RepoError::not_found("task", id.as_str()))
        })
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> RepoResult<Task> {
        patch.validate()?;
        self.with_conn(|conn| {
            let mut task = load_task(conn, id)?.ok_or_else(|| RepoError::not_found("task", id))?;
            patch.apply_to(&mut task);
            conn.execute(
                "UPDATE tasks
                 SET
                    title = ?1,
                    description = ?2,
                    status = ?3,
                    due_date = ?4,
                    assigned_to = ?5,
                    is_archived = ?6
                 WHERE id = ?7;",
                params![
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.due_date.map(to_epoch_ms),
                    task.assigned_to,
                    bool_to_int(task.is_archived),
                    id,
                ],
            )?;
            Ok(task)
        })
    }

    fn delete_task(&self, id: &str) -> RepoResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found("task", id));
            }
            Ok(())
        })
    }

    fn delete_tasks_for_project(&self, project_id: &str) -> RepoResult<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM tasks WHERE project_id = ?1;", [project_id])?)
        })
    }

    fn list_due_tasks(&self, query: &DueTaskQuery) -> RepoResult<Vec<Task>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE assigned_to = ?1
                       AND status <> ?2
                       AND is_archived = 0
                       AND due_date IS NOT NULL
                       AND due_date >= ?3
                       AND due_date <= ?4
                     ORDER BY due_date ASC, rowid ASC;"
                ),
                params![
                    query.assignee,
                    TaskStatus::Done.as_str(),
                    to_epoch_ms(query.due_from),
                    to_epoch_ms(query.due_until),
                ],
            )
        })
    }
}

fn query_tasks(conn: &Connection, sql: &str, params: impl Params) -> RepoResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        match parse_task_row(row)? {
            Some(task) => tasks.push(task),
            None => {
                let id: String = row.get("id")?;
                warn!("event=task_row_skipped module=sqlite_backend status=skip reason=unknown_status task_id={id}");
            }
        }
    }
    Ok(tasks)
}

fn load_task(conn: &Connection, id: &str) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    parse_task_row(row)?.map(Some).ok_or_else(|| {
        RepoError::InvalidData(format!("task `{id}` has an unrecognized status"))
    })
}

/// Returns `Ok(None)` when the stored status is not a kanban column.
fn parse_task_row(row: &Row<'_>) -> RepoResult<Option<Task>> {
    let status_text: String = row.get("status")?;
    let Some(status) = TaskStatus::parse(&status_text) else {
        return Ok(None);
    };

    Ok(Some(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        created_at: from_epoch_ms(row.get("created_at")?, "tasks.created_at")?,
        due_date: opt_from_epoch_ms(row.get("due_date")?, "tasks.due_date")?,
        assigned_to: row.get("assigned_to")?,
        is_archived: int_to_bool(row.get("is_archived")?, "tasks.is_archived")?,
    }))
}
