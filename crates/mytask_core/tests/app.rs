mod common;

use common::{t0, CountingBackend, RecordingNotifier};
use mytask_core::service::drag::{DropColumn, TaskCard, TransferData};
use mytask_core::{AppConfig, ManualClock, MyTaskApp, NewTask, TaskStatus};
use std::sync::Arc;

fn app() -> (MyTaskApp<CountingBackend>, Arc<RecordingNotifier>) {
    let mut config = AppConfig::default();
    config.reminders.enabled = false;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = MyTaskApp::with_parts(
        Arc::new(CountingBackend::new()),
        config,
        notifier.clone(),
        Arc::new(ManualClock::new(t0())),
    );
    (app, notifier)
}

#[test]
fn signing_in_points_every_store_at_the_user() {
    let (mut app, _) = app();
    assert!(app.sign_up("a@b.com", "secret1", "Ann", None).success);
    let user_id = app.session().current_user().unwrap().id.clone();

    assert_eq!(app.store().user_id(), Some(user_id.as_str()));

    assert!(app.sign_out().success);
    assert!(app.store().user_id().is_none());
    assert!(app.notifications().notifications().is_empty());
}

#[test]
fn dropping_a_card_on_a_column_moves_the_task() {
    let (mut app, notifier) = app();
    assert!(app.sign_up("a@b.com", "secret1", "Ann", None).success);
    let project = app.store_mut().create_project("Launch", "").unwrap();
    let task = app
        .store_mut()
        .create_task(NewTask::new(project.id.clone(), "Write outline", t0()))
        .unwrap();

    let mut card = TaskCard::new(&task, false);
    let mut transfer = TransferData::new();
    assert!(card.drag_start(&mut transfer));

    let mut done = DropColumn::new(TaskStatus::Done);
    done.drag_over();
    let moved = app.drop_on_column(&mut done, &transfer).unwrap();
    card.drag_end();

    assert_eq!(moved.status, TaskStatus::Done);
    assert_eq!(app.board().counts(), (0, 0, 1));
    assert!(!done.is_drop_target());
    assert_eq!(notifier.count("completed"), 1);
}

#[test]
fn dropping_on_the_same_column_does_nothing() {
    let (mut app, notifier) = app();
    assert!(app.sign_up("a@b.com", "secret1", "Ann", None).success);
    let project = app.store_mut().create_project("Launch", "").unwrap();
    let task = app
        .store_mut()
        .create_task(NewTask::new(project.id.clone(), "Write outline", t0()))
        .unwrap();

    let mut transfer = TransferData::new();
    TaskCard::new(&task, false).drag_start(&mut transfer);

    let mut todo = DropColumn::new(TaskStatus::Todo);
    assert!(app.drop_on_column(&mut todo, &transfer).is_none());
    assert_eq!(app.board().counts(), (1, 0, 0));
    assert_eq!(notifier.count("completed"), 0);
}

#[test]
fn start_without_a_session_is_anonymous() {
    let (mut app, _) = app();
    assert_eq!(app.start(), mytask_core::BootstrapOutcome::Anonymous);
    assert!(app.store().user_id().is_none());
}

#[test]
fn reminders_need_a_signed_in_user() {
    let (mut app, _) = app();
    assert!(!app.check_reminders().ran);
    assert!(app.sign_up("a@b.com", "secret1", "Ann", None).success);
    assert!(app.check_reminders().ran);
}
