//! Composition root.
//!
//! # Responsibility
//! - Build every state object around one injected backend.
//! - Keep the project store and the notification center pointed at the
//!   principal the session manager resolved.

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::model::task::Task;
use crate::repo::Backend;
use crate::service::drag::{DropColumn, MoveIntent, TransferData};
use crate::service::kanban::KanbanBoard;
use crate::service::notification_center::NotificationCenter;
use crate::service::notifier::TaskNotifier;
use crate::service::project_store::ProjectStore;
use crate::service::reminder::{ReminderReport, ReminderScheduler};
use crate::service::session::{AuthOutcome, BootstrapOutcome, SessionManager};
use crate::service::sms_dispatcher::SmsDispatcher;
use std::sync::Arc;

pub struct MyTaskApp<B> {
    config: AppConfig,
    session: SessionManager<B>,
    store: ProjectStore<B>,
    notifications: NotificationCenter<B>,
    reminders: Arc<ReminderScheduler<B>>,
}

impl<B> MyTaskApp<B>
where
    B: Backend + 'static,
{
    /// Wires the app with SMS delivery built from `config.sms`.
    pub fn new(backend: Arc<B>, config: AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let dispatcher = SmsDispatcher::from_config(Arc::clone(&backend), &config.sms, Arc::clone(&clock));
        Self::with_parts(backend, config, Arc::new(dispatcher), clock)
    }

    /// Wires the app with an explicit notifier and clock.
    pub fn with_parts(
        backend: Arc<B>,
        config: AppConfig,
        notifier: Arc<dyn TaskNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reminders = Arc::new(ReminderScheduler::new(
            Arc::clone(&backend),
            Arc::clone(&notifier),
            Arc::clone(&clock),
            config.reminders.throttle(),
        ));

        let mut session = SessionManager::new(Arc::clone(&backend), Arc::clone(&clock));
        if config.reminders.enabled {
            session = session.with_reminders(
                Arc::clone(&reminders),
                config.reminders.initial_delay(),
                config.reminders.interval(),
            );
        }

        let store = ProjectStore::new(
            Arc::clone(&backend),
            notifier,
            Arc::clone(&clock),
            config.cache.freshness(),
        );
        let notifications = NotificationCenter::new(backend, clock);

        Self {
            config,
            session,
            store,
            notifications,
            reminders,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager<B> {
        &self.session
    }

    pub fn store(&self) -> &ProjectStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProjectStore<B> {
        &mut self.store
    }

    pub fn notifications(&self) -> &NotificationCenter<B> {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationCenter<B> {
        &mut self.notifications
    }

    /// Restores the previous session within the configured timeout.
    pub fn start(&mut self) -> BootstrapOutcome {
        let outcome = self
            .session
            .bootstrap(self.config.session.bootstrap_timeout());
        self.sync_principal();
        outcome
    }

    /// Picks up a session lookup that finished after `start` timed out.
    pub fn poll_pending_session(&mut self) -> Option<BootstrapOutcome> {
        let outcome = self.session.poll_pending_session()?;
        self.sync_principal();
        Some(outcome)
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> AuthOutcome {
        let outcome = self.session.sign_in(email, password);
        self.sync_principal();
        outcome
    }

    pub fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
        phone_number: Option<&str>,
    ) -> AuthOutcome {
        let outcome = self.session.sign_up(email, password, name, phone_number);
        self.sync_principal();
        outcome
    }

    pub fn sign_out(&mut self) -> AuthOutcome {
        let outcome = self.session.sign_out();
        self.sync_principal();
        outcome
    }

    /// Board of the current project.
    pub fn board(&self) -> KanbanBoard {
        self.store.board()
    }

    /// Handles a drop on a column; forwards a move when the payload allows.
    pub fn drop_on_column(
        &mut self,
        column: &mut DropColumn,
        transfer: &TransferData,
    ) -> Option<Task> {
        let intent = column.drop(transfer)?;
        self.apply_move(intent)
    }

    pub fn apply_move(&mut self, intent: MoveIntent) -> Option<Task> {
        self.store.move_task(&intent.task_id, intent.to)
    }

    /// Runs a reminder check for the signed-in user now, subject to the
    /// shared throttle.
    pub fn check_reminders(&self) -> ReminderReport {
        match self.session.current_user() {
            Some(user) => self.reminders.check_upcoming(&user.id),
            None => ReminderReport::default(),
        }
    }

    fn sync_principal(&mut self) {
        let user_id = self.session.current_user().map(|user| user.id.clone());
        self.store.set_user(user_id.clone());
        self.notifications.set_user(user_id);
    }
}
