mod common;

use chrono::Duration;
use common::t0;
use mytask_core::model::notification::NewNotification;
use mytask_core::model::user::{SignUpProfile, User};
use mytask_core::repo::{
    AuthGateway, DueTaskQuery, NotificationRepository, ProjectRepository, SmsLogRepository,
    TaskRepository, UserRepository,
};
use mytask_core::{
    AuthError, NewProject, NewTask, ProjectPatch, RepoError, SmsDeliveryStatus, SmsLogEntry,
    SqliteBackend, TaskPatch, TaskStatus,
};

fn profile() -> SignUpProfile {
    SignUpProfile {
        name: "Ada".to_string(),
        phone_number: None,
    }
}

#[test]
fn sign_up_then_sign_in_and_restore_session() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let identity = backend
        .sign_up("Ada@Example.com", "secret1", &profile())
        .unwrap();
    assert_eq!(identity.email, "ada@example.com");
    assert!(backend.session_token().is_some());

    backend.sign_out().unwrap();
    assert!(matches!(
        backend.current_identity(),
        Err(AuthError::SessionMissing)
    ));

    let again = backend.sign_in("ada@example.com", "secret1").unwrap();
    assert_eq!(again.user_id, identity.user_id);
    assert_eq!(backend.current_identity().unwrap().user_id, identity.user_id);
}

#[test]
fn duplicate_email_and_wrong_password_are_rejected() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend.sign_up("ada@example.com", "secret1", &profile()).unwrap();

    assert!(matches!(
        backend.sign_up("ADA@example.com", "secret2", &profile()),
        Err(AuthError::EmailAlreadyRegistered(_))
    ));
    assert!(matches!(
        backend.sign_in("ada@example.com", "wrong-password"),
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        backend.sign_up("bob@example.com", "123", &profile()),
        Err(AuthError::Validation(_))
    ));
}

#[test]
fn session_survives_reopening_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mytask.db");

    let token = {
        let backend = SqliteBackend::open(&path).unwrap();
        backend.sign_up("ada@example.com", "secret1", &profile()).unwrap();
        backend.session_token().unwrap()
    };

    let reopened = SqliteBackend::open(&path).unwrap();
    assert!(matches!(
        reopened.current_identity(),
        Err(AuthError::SessionMissing)
    ));
    reopened.resume_session(token);
    assert_eq!(reopened.current_identity().unwrap().email, "ada@example.com");
}

#[test]
fn user_profiles_round_trip() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    assert!(backend.get_user("u1").unwrap().is_none());

    let user = User::synthesized(
        "u1",
        "Ada",
        "ada@example.com",
        Some("+15551234567".to_string()),
        t0(),
    );
    backend.insert_user(&user).unwrap();

    assert_eq!(backend.get_user("u1").unwrap(), Some(user));
}

#[test]
fn projects_are_listed_newest_first_without_archived() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let older = backend
        .create_project(&NewProject::new("Older", "", "u1", t0()))
        .unwrap();
    let newer = backend
        .create_project(&NewProject::new("Newer", "desc", "u1", t0() + Duration::minutes(1)))
        .unwrap();
    backend
        .create_project(&NewProject::new("Someone else", "", "u2", t0()))
        .unwrap();

    let listed: Vec<_> = backend
        .list_projects("u1")
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(listed, vec!["Newer", "Older"]);

    let archived = backend
        .update_project(
            &older.id,
            &ProjectPatch {
                is_archived: Some(true),
                ..ProjectPatch::default()
            },
        )
        .unwrap();
    assert!(archived.is_archived);
    assert_eq!(backend.list_projects("u1").unwrap(), vec![newer]);
}

#[test]
fn blank_project_name_is_rejected() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let err = backend
        .create_project(&NewProject::new("   ", "", "u1", t0()))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn task_updates_and_missing_rows() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let project = backend
        .create_project(&NewProject::new("Launch", "", "u1", t0()))
        .unwrap();
    let task = backend
        .create_task(&NewTask::new(project.id.clone(), "Write copy", t0()))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Todo);

    let moved = backend
        .update_task(&task.id, &TaskPatch::status(TaskStatus::Doing))
        .unwrap();
    assert_eq!(moved.status, TaskStatus::Doing);
    assert_eq!(backend.get_task(&task.id).unwrap(), Some(moved));

    assert!(matches!(
        backend.update_task("missing", &TaskPatch::status(TaskStatus::Done)),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        backend.delete_task("missing"),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn unknown_status_rows_are_skipped_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mytask.db");
    let backend = SqliteBackend::open(&path).unwrap();
    let project = backend
        .create_project(&NewProject::new("Launch", "", "u1", t0()))
        .unwrap();
    backend
        .create_task(&NewTask::new(project.id.clone(), "Valid", t0()))
        .unwrap();
    let odd = backend
        .create_task(&NewTask::new(project.id.clone(), "Odd", t0()))
        .unwrap();

    // Another client wrote a status this build does not know.
    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("UPDATE tasks SET status = 'Blocked' WHERE id = ?1;", [&odd.id])
        .unwrap();
    drop(raw);

    let titles: Vec<_> = backend
        .list_tasks(&project.id)
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, vec!["Valid"]);
    assert!(matches!(
        backend.get_task(&odd.id),
        Err(RepoError::InvalidData(_))
    ));
}

#[test]
fn due_task_query_filters_window_assignee_and_status() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let project = backend
        .create_project(&NewProject::new("Launch", "", "u1", t0()))
        .unwrap();
    let add = |title: &str, due_hours: i64, status: TaskStatus, assignee: &str| {
        backend
            .create_task(
                &NewTask::new(project.id.clone(), title, t0())
                    .with_status(status)
                    .with_due_date(t0() + Duration::hours(due_hours))
                    .assigned_to(assignee),
            )
            .unwrap()
    };
    add("later", 30, TaskStatus::Todo, "u1");
    add("sooner", 2, TaskStatus::Doing, "u1");
    add("finished", 3, TaskStatus::Done, "u1");
    add("not mine", 4, TaskStatus::Todo, "u2");
    add("too late", 24 * 5, TaskStatus::Todo, "u1");
    backend
        .create_task(&NewTask::new(project.id.clone(), "no due date", t0()).assigned_to("u1"))
        .unwrap();

    let due = backend
        .list_due_tasks(&DueTaskQuery {
            assignee: "u1".to_string(),
            due_from: t0(),
            due_until: t0() + Duration::hours(48),
        })
        .unwrap();
    let titles: Vec<_> = due.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles, vec!["sooner", "later"]);
}

#[test]
fn deleting_tasks_for_a_project_reports_the_count() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let project = backend
        .create_project(&NewProject::new("Launch", "", "u1", t0()))
        .unwrap();
    for title in ["a", "b", "c"] {
        backend
            .create_task(&NewTask::new(project.id.clone(), title, t0()))
            .unwrap();
    }

    assert_eq!(backend.delete_tasks_for_project(&project.id).unwrap(), 3);
    backend.delete_project(&project.id).unwrap();
    assert!(backend.get_project(&project.id).unwrap().is_none());
    assert!(backend.list_tasks(&project.id).unwrap().is_empty());
}

#[test]
fn notifications_are_listed_newest_first_and_marked_read() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let first = backend
        .create_notification(&NewNotification::new("u1", "first", t0()))
        .unwrap();
    backend
        .create_notification(&NewNotification::new("u1", "second", t0() + Duration::seconds(5)))
        .unwrap();

    let listed = backend.list_notifications("u1").unwrap();
    assert_eq!(listed[0].message, "second");
    assert!(listed.iter().all(|item| !item.read));

    let read = backend.mark_notification_read(&first.id).unwrap();
    assert!(read.read);
    backend.delete_notification(&first.id).unwrap();
    assert_eq!(backend.list_notifications("u1").unwrap().len(), 1);
}

#[test]
fn sms_logs_keep_failures_too() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend
        .insert_sms_log(&SmsLogEntry {
            user_id: Some("u1".to_string()),
            phone_number: "+15551234567".to_string(),
            message: "hello".to_string(),
            status: SmsDeliveryStatus::Failed,
            provider_message_id: None,
            error: Some("unverified".to_string()),
            created_at: t0(),
        })
        .unwrap();

    let logs = backend.list_sms_logs(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SmsDeliveryStatus::Failed);
    assert_eq!(logs[0].error.as_deref(), Some("unverified"));
}
