mod common;

use chrono::{Duration, Local, TimeZone, Utc};
use common::{CountingBackend, RecordingNotifier};
use mytask_core::repo::{ProjectRepository, TaskRepository};
use mytask_core::service::reminder::{reminder_window_in, ReminderScheduler};
use mytask_core::{ManualClock, NewProject, NewTask, TaskStatus};
use std::sync::Arc;
use std::thread;

struct Fixture {
    backend: Arc<CountingBackend>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
    scheduler: Arc<ReminderScheduler<CountingBackend>>,
}

fn fixture(throttle: Duration) -> Fixture {
    let backend = Arc::new(CountingBackend::new());
    let notifier = Arc::new(RecordingNotifier::default());
    // Local noon keeps the whole scenario inside one calendar day.
    let noon = Local
        .with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
        .earliest()
        .unwrap()
        .with_timezone(&Utc);
    let clock = Arc::new(ManualClock::new(noon));
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::clone(&backend),
        notifier.clone(),
        clock.clone(),
        throttle,
    ));
    Fixture {
        backend,
        notifier,
        clock,
        scheduler,
    }
}

fn seed_tasks(fx: &Fixture) {
    let now = mytask_core::Clock::now(fx.clock.as_ref());
    let (from, until) = reminder_window_in(now, &Local).unwrap();
    let project = fx
        .backend
        .create_project(&NewProject::new("Launch", "", "u1", now))
        .unwrap();
    let add = |title: &str, due, status, assignee: &str| {
        fx.backend
            .create_task(
                &NewTask::new(project.id.clone(), title, now)
                    .with_status(status)
                    .with_due_date(due)
                    .assigned_to(assignee),
            )
            .unwrap();
    };
    add("due tomorrow night", until - Duration::minutes(1), TaskStatus::Todo, "u1");
    add("due this morning", from + Duration::minutes(1), TaskStatus::Doing, "u1");
    add("already done", from + Duration::hours(2), TaskStatus::Done, "u1");
    add("someone else", from + Duration::hours(2), TaskStatus::Todo, "u2");
    add("next week", until + Duration::days(5), TaskStatus::Todo, "u1");
    add("last week", from - Duration::days(5), TaskStatus::Todo, "u1");
}

#[test]
fn check_sends_one_reminder_per_open_task_in_the_window() {
    let fx = fixture(Duration::hours(1));
    seed_tasks(&fx);

    let report = fx.scheduler.check_upcoming("u1");

    assert!(report.ran);
    assert_eq!(report.due_tasks, 2);
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 0);
    let titles: Vec<_> = fx
        .notifier
        .sent()
        .into_iter()
        .map(|sent| (sent.kind, sent.task_title, sent.project_name))
        .collect();
    assert_eq!(
        titles,
        vec![
            ("due_soon", "due this morning".to_string(), "Launch".to_string()),
            ("due_soon", "due tomorrow night".to_string(), "Launch".to_string()),
        ]
    );
}

#[test]
fn checks_inside_the_throttle_window_are_skipped() {
    let fx = fixture(Duration::hours(1));
    seed_tasks(&fx);

    assert!(fx.scheduler.check_upcoming("u1").ran);
    fx.clock.advance(Duration::minutes(30));
    let skipped = fx.scheduler.check_upcoming("u1");
    assert!(!skipped.ran);
    assert_eq!(fx.notifier.count("due_soon"), 2);

    fx.clock.advance(Duration::minutes(30));
    assert!(fx.scheduler.check_upcoming("u1").ran);
    assert_eq!(fx.notifier.count("due_soon"), 4);
}

#[test]
fn no_due_tasks_sends_nothing() {
    let fx = fixture(Duration::hours(1));

    let report = fx.scheduler.check_upcoming("u1");
    assert!(report.ran);
    assert_eq!(report.due_tasks, 0);
    assert!(fx.notifier.sent().is_empty());
}

#[test]
fn background_loop_runs_after_the_initial_delay_and_stops() {
    let fx = fixture(Duration::zero());
    seed_tasks(&fx);

    let handle = Arc::clone(&fx.scheduler)
        .start(
            "u1".to_string(),
            std::time::Duration::from_millis(10),
            std::time::Duration::from_secs(3600),
        )
        .unwrap();

    let mut waited = 0;
    while fx.notifier.count("due_soon") < 2 && waited < 200 {
        thread::sleep(std::time::Duration::from_millis(10));
        waited += 1;
    }
    handle.stop();

    assert_eq!(fx.notifier.count("due_soon"), 2);
    assert!(fx.scheduler.throttle().last_check().is_some());
}
