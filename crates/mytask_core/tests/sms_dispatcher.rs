mod common;

use common::t0;
use mytask_core::model::user::User;
use mytask_core::repo::{SmsLogRepository, UserRepository};
use mytask_core::service::sms_dispatcher::{DeliverySettings, SmsDispatcher};
use mytask_core::service::sms_provider::{SentMessage, SmsError, SmsProvider};
use mytask_core::{
    DeliveryMode, ManualClock, SmsDeliveryStatus, SqliteBackend, Task, TaskNotifier, TaskStatus,
};
use std::sync::{Arc, Mutex};

/// Provider double that records recipients and answers with a fixed result.
struct FakeProvider {
    outbox: Arc<Mutex<Vec<(String, String)>>>,
    reply: Result<SentMessage, SmsError>,
}

impl SmsProvider for FakeProvider {
    fn send(&self, to: &str, body: &str) -> Result<SentMessage, SmsError> {
        self.outbox
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        self.reply.clone()
    }
}

struct Fixture {
    backend: Arc<SqliteBackend>,
    outbox: Arc<Mutex<Vec<(String, String)>>>,
    dispatcher: SmsDispatcher<SqliteBackend>,
}

fn fixture(mode: DeliveryMode, reply: Result<SentMessage, SmsError>) -> Fixture {
    let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
    backend
        .insert_user(&User::synthesized(
            "u1",
            "Ann",
            "a@b.com",
            Some("+15550001111".to_string()),
            t0(),
        ))
        .unwrap();
    let outbox = Arc::new(Mutex::new(Vec::new()));
    let provider = FakeProvider {
        outbox: Arc::clone(&outbox),
        reply,
    };
    let dispatcher = SmsDispatcher::new(
        Arc::clone(&backend),
        Some(Box::new(provider)),
        DeliverySettings {
            mode,
            verified_number: Some("+15559998888".to_string()),
        },
        Arc::new(ManualClock::new(t0())),
    );
    Fixture {
        backend,
        outbox,
        dispatcher,
    }
}

fn accepted() -> Result<SentMessage, SmsError> {
    Ok(SentMessage {
        message_id: "SM123".to_string(),
    })
}

fn task(title: &str) -> Task {
    Task {
        id: "t1".to_string(),
        project_id: "p1".to_string(),
        title: title.to_string(),
        description: String::new(),
        status: TaskStatus::Done,
        created_at: t0(),
        due_date: None,
        assigned_to: Some("u1".to_string()),
        is_archived: false,
    }
}

#[test]
fn sandbox_mode_sends_to_the_verified_number() {
    let fx = fixture(DeliveryMode::Sandbox, accepted());

    let outcome = fx.dispatcher.task_completed("u1", &task("Write outline"), "Launch");

    assert!(outcome.success);
    assert_eq!(outcome.message_id.as_deref(), Some("SM123"));
    let outbox = fx.outbox.lock().unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].0, "+15559998888");
    assert_eq!(
        outbox[0].1,
        "MyTask: Task \"Write outline\" in project \"Launch\" has been completed."
    );
}

#[test]
fn production_mode_uses_the_profile_number() {
    let fx = fixture(DeliveryMode::Production, accepted());

    let outcome = fx.dispatcher.task_created("u1", &task("Write outline"), "Launch");

    assert!(outcome.success);
    assert_eq!(fx.outbox.lock().unwrap()[0].0, "+15550001111");
}

#[test]
fn production_mode_without_a_number_fails_without_sending() {
    let fx = fixture(DeliveryMode::Production, accepted());

    let outcome = fx.dispatcher.task_created("nobody", &task("Write outline"), "Launch");

    assert!(!outcome.success);
    assert!(fx.outbox.lock().unwrap().is_empty());
    assert!(fx.backend.list_sms_logs(10).unwrap().is_empty());
}

#[test]
fn every_attempt_is_written_to_the_audit_log() {
    let fx = fixture(DeliveryMode::Sandbox, accepted());
    fx.dispatcher.send_sms(Some("u1"), "+15559998888", "hello");

    let logs = fx.backend.list_sms_logs(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SmsDeliveryStatus::Sent);
    assert_eq!(logs[0].provider_message_id.as_deref(), Some("SM123"));
    assert_eq!(logs[0].user_id.as_deref(), Some("u1"));
    assert_eq!(logs[0].message, "hello");
}

#[test]
fn unverified_recipient_errors_are_rewritten_and_logged() {
    let fx = fixture(
        DeliveryMode::Sandbox,
        Err(SmsError::Rejected {
            code: Some(21608),
            message: "The number is unverified. Trial accounts cannot send messages to unverified numbers".to_string(),
        }),
    );

    let outcome = fx.dispatcher.task_created("u1", &task("Write outline"), "Launch");

    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert!(error.contains("not verified"));
    assert!(error.contains("8888"));

    let logs = fx.backend.list_sms_logs(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SmsDeliveryStatus::Failed);
    assert_eq!(logs[0].error.as_deref(), Some(error.as_str()));
}

#[test]
fn missing_provider_fails_and_still_audits() {
    let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let dispatcher = SmsDispatcher::new(
        Arc::clone(&backend),
        None,
        DeliverySettings {
            mode: DeliveryMode::Sandbox,
            verified_number: Some("+15559998888".to_string()),
        },
        Arc::new(ManualClock::new(t0())),
    );
    assert!(!dispatcher.is_configured());

    let outcome = dispatcher.send_sms(None, "+15559998888", "hello");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("SMS delivery is not configured"));
    let logs = backend.list_sms_logs(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SmsDeliveryStatus::Failed);
    assert!(logs[0].user_id.is_none());
}

#[test]
fn due_soon_message_names_the_due_day() {
    let fx = fixture(DeliveryMode::Sandbox, accepted());
    let due = t0() + chrono::Duration::hours(3);

    fx.dispatcher.task_due_soon("u1", &task("Write outline"), "Launch", due);

    let body = fx.outbox.lock().unwrap()[0].1.clone();
    assert!(body.starts_with("MyTask: Reminder! Task \"Write outline\" in project \"Launch\" is due on "));
    let day = due.with_timezone(&chrono::Local).format("%Y-%m-%d").to_string();
    assert!(body.ends_with(&format!("{day}.")));
}
