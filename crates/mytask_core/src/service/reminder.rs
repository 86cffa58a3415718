//! Due-soon reminder scheduler.
//!
//! # Responsibility
//! - Find open tasks assigned to the user and due between the local start of
//!   today and the local end of tomorrow.
//! - Send one due-soon notification per task.
//! - Run the check shortly after start and then on a fixed interval on a
//!   background thread.
//!
//! # Invariants
//! - A check is skipped when the previous one ran less than the throttle
//!   window ago, whoever triggered it.
//! - Checks never return errors; failures are logged and the loop goes on.

use crate::clock::Clock;
use crate::model::user::UserId;
use crate::repo::{DueTaskQuery, ProjectRepository, TaskRepository};
use crate::service::notifier::TaskNotifier;
use chrono::{DateTime, Days, Duration, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

const FALLBACK_PROJECT_NAME: &str = "a project";

/// Timestamp of the last check, shared by every scheduler clone.
#[derive(Debug, Clone, Default)]
pub struct ReminderThrottle {
    last_check: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl ReminderThrottle {
    /// Records `now` and returns true when a check may run.
    fn try_acquire(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let mut last = self
            .last_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            if now.signed_duration_since(previous) < window {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        *self
            .last_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Summary of one check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    /// False when the check was throttled or could not query the backend.
    pub ran: bool,
    pub due_tasks: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct ReminderScheduler<B> {
    backend: Arc<B>,
    notifier: Arc<dyn TaskNotifier>,
    clock: Arc<dyn Clock>,
    throttle_window: Duration,
    throttle: ReminderThrottle,
}

impl<B> ReminderScheduler<B>
where
    B: TaskRepository + ProjectRepository + 'static,
{
    pub fn new(
        backend: Arc<B>,
        notifier: Arc<dyn TaskNotifier>,
        clock: Arc<dyn Clock>,
        throttle_window: Duration,
    ) -> Self {
        Self {
            backend,
            notifier,
            clock,
            throttle_window,
            throttle: ReminderThrottle::default(),
        }
    }

    /// Shares an existing throttle timestamp.
    pub fn with_throttle(mut self, throttle: ReminderThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn throttle(&self) -> &ReminderThrottle {
        &self.throttle
    }

    /// Runs one check for `user_id` unless throttled.
    pub fn check_upcoming(&self, user_id: &str) -> ReminderReport {
        let now = self.clock.now();
        if !self.throttle.try_acquire(now, self.throttle_window) {
            debug!("event=reminder_check module=reminder status=skip reason=throttled");
            return ReminderReport::default();
        }

        let Some((due_from, due_until)) = reminder_window_in(now, &Local) else {
            warn!("event=reminder_check module=reminder status=error reason=window_unresolvable");
            return ReminderReport::default();
        };
        let query = DueTaskQuery {
            assignee: user_id.to_string(),
            due_from,
            due_until,
        };
        let tasks = match self.backend.list_due_tasks(&query) {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(
                    "event=reminder_check module=reminder status=error error={}",
                    err
                );
                return ReminderReport::default();
            }
        };

        let mut report = ReminderReport {
            ran: true,
            due_tasks: tasks.len(),
            ..ReminderReport::default()
        };
        let mut project_names: HashMap<String, String> = HashMap::new();
        for task in &tasks {
            let Some(due_date) = task.due_date else {
                continue;
            };
            let project_name = project_names
                .entry(task.project_id.clone())
                .or_insert_with(|| self.project_name(&task.project_id))
                .clone();
            let outcome = self
                .notifier
                .task_due_soon(user_id, task, &project_name, due_date);
            if outcome.success {
                report.sent += 1;
            } else {
                report.failed += 1;
                warn!(
                    "event=reminder_send module=reminder status=error task_id={} error={}",
                    task.id,
                    outcome.error.as_deref().unwrap_or("unknown")
                );
            }
        }

        info!(
            "event=reminder_check module=reminder status=ok due={} sent={} failed={}",
            report.due_tasks, report.sent, report.failed
        );
        report
    }

    fn project_name(&self, project_id: &str) -> String {
        match self.backend.get_project(project_id) {
            Ok(Some(project)) => project.name,
            Ok(None) => FALLBACK_PROJECT_NAME.to_string(),
            Err(err) => {
                warn!(
                    "event=reminder_project_name module=reminder status=error project_id={} error={}",
                    project_id, err
                );
                FALLBACK_PROJECT_NAME.to_string()
            }
        }
    }

    /// Spawns the background loop: one check after `initial_delay`, then one
    /// per `interval` until the handle is stopped or dropped.
    pub fn start(
        self: Arc<Self>,
        user_id: UserId,
        initial_delay: std::time::Duration,
        interval: std::time::Duration,
    ) -> std::io::Result<ReminderHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name("mytask-reminders".to_string())
            .spawn(move || {
                let stopped = |wait: std::time::Duration| {
                    !matches!(stop_rx.recv_timeout(wait), Err(RecvTimeoutError::Timeout))
                };
                if stopped(initial_delay) {
                    return;
                }
                loop {
                    self.check_upcoming(&user_id);
                    if stopped(interval) {
                        break;
                    }
                }
                debug!("event=reminder_loop module=reminder status=stopped");
            })?;
        info!("event=reminder_loop module=reminder status=start");
        Ok(ReminderHandle {
            stop_tx: Some(stop_tx),
            join: Some(join),
        })
    }
}

/// Owner of the background loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct ReminderHandle {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ReminderHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The loop may already be gone.
            let _ = stop_tx.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("event=reminder_loop module=reminder status=error reason=thread_panicked");
            }
        }
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `[start of today, end of tomorrow]` in `zone`, as UTC instants.
pub fn reminder_window_in<Tz: TimeZone>(
    now: DateTime<Utc>,
    zone: &Tz,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let today = now.with_timezone(zone).date_naive();
    let start = today.and_hms_opt(0, 0, 0)?;
    let end = today
        .checked_add_days(Days::new(1))?
        .and_hms_milli_opt(23, 59, 59, 999)?;
    Some((to_utc(zone, start)?, to_utc(zone, end)?))
}

fn to_utc<Tz: TimeZone>(zone: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&local)
        .earliest()
        .map(|value| value.with_timezone(&Utc))
}
