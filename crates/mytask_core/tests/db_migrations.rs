use mytask_core::db::migrations::{latest_version, schema_version};
use mytask_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

const TABLES: [&str; 7] = [
    "auth_identities",
    "auth_sessions",
    "users",
    "projects",
    "tasks",
    "notifications",
    "sms_logs",
];

#[test]
fn in_memory_database_has_the_full_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in TABLES {
        assert!(table_exists(&conn, table), "missing table {table}");
    }
}

#[test]
fn file_database_is_created_with_its_directory_and_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("mytask.db");

    drop(open_db(&path).unwrap());
    assert!(path.exists());

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened).unwrap(), latest_version());
    assert!(table_exists(&reopened, "tasks"));
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 42;")
        .unwrap();

    match open_db(&path) {
        Err(DbError::SchemaTooNew { found, supported }) => {
            assert_eq!(found, 42);
            assert_eq!(supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema was accepted"),
    }
}

#[test]
fn deleting_a_project_row_cascades_to_its_tasks() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO projects (id, name, owner_id, created_at) VALUES ('p1', 'Launch', 'u1', 0);
         INSERT INTO tasks (id, project_id, title, status, created_at) VALUES ('t1', 'p1', 'Ship', 'To Do', 0);
         DELETE FROM projects WHERE id = 'p1';",
    )
    .unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM tasks;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn sms_log_status_is_constrained() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO sms_logs (phone_number, message, status, created_at) VALUES ('+1', 'x', 'queued', 0);",
        [],
    );
    assert!(result.is_err());
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [name],
        |row| row.get::<_, bool>(0),
    )
    .unwrap()
}
