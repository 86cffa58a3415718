//! Session/identity manager.
//!
//! # Responsibility
//! - Sign users in, up and out through the backend identity service.
//! - Resolve the application profile behind an identity, creating or
//!   synthesizing it when the row is missing.
//! - Restore an existing session at startup without waiting past a bound.
//! - Start the reminder loop once, on the first resolved user.
//!
//! # Invariants
//! - Failed operations keep the previous user and report a readable error.
//! - "No session" is a normal startup outcome, not an error.
//! - The reminder loop is started at most once per manager and is stopped
//!   on sign-out.

use crate::clock::Clock;
use crate::model::user::{display_name_from_email, AuthIdentity, SignUpProfile, User, UserId};
use crate::model::validation::{normalize_phone_number, ValidationError};
use crate::repo::{AuthError, AuthGateway, ProjectRepository, TaskRepository, UserRepository};
use crate::service::events::EventHub;
use crate::service::reminder::{ReminderHandle, ReminderScheduler};
use log::{info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PROFILE_INSERT_ATTEMPTS: usize = 2;

/// Result of a sign-in/up/out call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl AuthOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }
}

/// How startup session restoration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Resolved(User),
    /// No session, or the lookup failed.
    Anonymous,
    /// The backend did not answer in time. A late answer can still be
    /// collected with `poll_pending_session`.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    UserChanged(Option<UserId>),
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
}

type SessionLookup = Result<Option<User>, AuthError>;

/// Profile values used when the row must be created.
struct ProfileSeed {
    name: String,
    phone_number: Option<String>,
}

struct ReminderLauncher<B> {
    scheduler: Arc<ReminderScheduler<B>>,
    initial_delay: Duration,
    interval: Duration,
}

pub struct SessionManager<B> {
    backend: Arc<B>,
    clock: Arc<dyn Clock>,
    user: Option<User>,
    loading: bool,
    last_error: Option<String>,
    pending: Option<Receiver<SessionLookup>>,
    reminders: Option<ReminderLauncher<B>>,
    reminders_started: bool,
    reminder_handle: Option<ReminderHandle>,
    events: EventHub<SessionEvent>,
}

impl<B> SessionManager<B>
where
    B: AuthGateway + UserRepository + TaskRepository + ProjectRepository + 'static,
{
    pub fn new(backend: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            user: None,
            loading: false,
            last_error: None,
            pending: None,
            reminders: None,
            reminders_started: false,
            reminder_handle: None,
            events: EventHub::default(),
        }
    }

    /// Registers the scheduler started on the first resolved user.
    pub fn with_reminders(
        mut self,
        scheduler: Arc<ReminderScheduler<B>>,
        initial_delay: Duration,
        interval: Duration,
    ) -> Self {
        self.reminders = Some(ReminderLauncher {
            scheduler,
            initial_delay,
            interval,
        });
        self
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn reminders_started(&self) -> bool {
        self.reminders_started
    }

    /// True while the background reminder loop is alive.
    pub fn reminders_running(&self) -> bool {
        self.reminder_handle.is_some()
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> AuthOutcome {
        self.begin();
        let result = self
            .backend
            .sign_in(email, password)
            .map(|identity| {
                let seed = ProfileSeed {
                    name: display_name_from_email(&identity.email),
                    phone_number: None,
                };
                load_profile(self.backend.as_ref(), self.clock.as_ref(), &identity, seed)
            });
        self.finish("sign_in", "Sign-in failed", result)
    }

    pub fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
        phone_number: Option<&str>,
    ) -> AuthOutcome {
        self.begin();
        let result = self.register(email, password, name, phone_number);
        self.finish("sign_up", "Sign-up failed", result)
    }

    fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        phone_number: Option<&str>,
    ) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankUserName.into());
        }
        let phone_number = phone_number
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(normalize_phone_number)
            .transpose()?;
        let profile = SignUpProfile {
            name: name.to_string(),
            phone_number: phone_number.clone(),
        };
        let identity = self.backend.sign_up(email, password, &profile)?;
        let seed = ProfileSeed {
            name: profile.name,
            phone_number,
        };
        Ok(load_profile(
            self.backend.as_ref(),
            self.clock.as_ref(),
            &identity,
            seed,
        ))
    }

    /// Ends the backend session. The local user is cleared either way.
    pub fn sign_out(&mut self) -> AuthOutcome {
        self.begin();
        let result = self.backend.sign_out();
        self.pending = None;
        self.stop_reminders();
        self.set_user(None);
        self.set_loading(false);
        match result {
            Ok(()) => {
                info!("event=sign_out module=session status=ok");
                AuthOutcome::ok()
            }
            Err(err) => {
                warn!("event=sign_out module=session status=error error={}", err);
                let message = format!("Sign-out failed: {err}");
                self.set_error(Some(message.clone()));
                AuthOutcome::failed(message)
            }
        }
    }

    /// Restores the backend session, waiting at most `timeout`.
    ///
    /// The lookup runs on a worker thread and is not cancelled on timeout.
    pub fn bootstrap(&mut self, timeout: Duration) -> BootstrapOutcome {
        self.set_loading(true);
        self.set_error(None);

        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        let clock = Arc::clone(&self.clock);
        let spawned = thread::Builder::new()
            .name("mytask-session".to_string())
            .spawn(move || {
                // The receiver may have given up already.
                let _ = tx.send(lookup_session(backend.as_ref(), clock.as_ref()));
            });
        if let Err(err) = spawned {
            warn!(
                "event=session_bootstrap module=session status=error reason=spawn_failed error={}",
                err
            );
            self.set_loading(false);
            return BootstrapOutcome::Anonymous;
        }

        let outcome = match rx.recv_timeout(timeout) {
            Ok(lookup) => self.apply_lookup(lookup),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "event=session_bootstrap module=session status=timeout timeout_ms={}",
                    timeout.as_millis()
                );
                self.pending = Some(rx);
                BootstrapOutcome::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("event=session_bootstrap module=session status=error reason=worker_lost");
                BootstrapOutcome::Anonymous
            }
        };
        self.set_loading(false);
        outcome
    }

    /// Collects a bootstrap answer that arrived after the timeout. Ignored
    /// when a user signed in meanwhile.
    pub fn poll_pending_session(&mut self) -> Option<BootstrapOutcome> {
        let rx = self.pending.take()?;
        match rx.try_recv() {
            Ok(lookup) => {
                if self.user.is_some() {
                    return None;
                }
                Some(self.apply_lookup(lookup))
            }
            Err(TryRecvError::Empty) => {
                self.pending = Some(rx);
                None
            }
            Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn has_pending_session(&self) -> bool {
        self.pending.is_some()
    }

    fn apply_lookup(&mut self, lookup: SessionLookup) -> BootstrapOutcome {
        match lookup {
            Ok(Some(user)) => {
                info!("event=session_bootstrap module=session status=ok");
                self.set_user(Some(user.clone()));
                self.start_reminders_once();
                BootstrapOutcome::Resolved(user)
            }
            Ok(None) => {
                info!("event=session_bootstrap module=session status=ok session=none");
                BootstrapOutcome::Anonymous
            }
            Err(err) => {
                warn!(
                    "event=session_bootstrap module=session status=error error={}",
                    err
                );
                self.set_error(Some(format!("Could not load the session: {err}")));
                BootstrapOutcome::Anonymous
            }
        }
    }

    fn begin(&mut self) {
        self.set_loading(true);
        self.set_error(None);
    }

    fn finish(
        &mut self,
        operation: &'static str,
        context: &str,
        result: Result<User, AuthError>,
    ) -> AuthOutcome {
        let outcome = match result {
            Ok(user) => {
                info!("event={} module=session status=ok", operation);
                self.set_user(Some(user));
                self.start_reminders_once();
                AuthOutcome::ok()
            }
            Err(err) => {
                warn!("event={} module=session status=error error={}", operation, err);
                let message = format!("{context}: {err}");
                self.set_error(Some(message.clone()));
                AuthOutcome::failed(message)
            }
        };
        self.set_loading(false);
        outcome
    }

    fn start_reminders_once(&mut self) {
        if self.reminders_started {
            return;
        }
        let (Some(launcher), Some(user)) = (&self.reminders, &self.user) else {
            return;
        };
        self.reminders_started = true;
        match Arc::clone(&launcher.scheduler).start(
            user.id.clone(),
            launcher.initial_delay,
            launcher.interval,
        ) {
            Ok(handle) => self.reminder_handle = Some(handle),
            Err(err) => warn!(
                "event=reminder_start module=session status=error error={}",
                err
            ),
        }
    }

    fn stop_reminders(&mut self) {
        if let Some(handle) = self.reminder_handle.take() {
            handle.stop();
            info!("event=reminder_stop module=session status=ok");
        }
    }

    fn set_user(&mut self, user: Option<User>) {
        let changed = self.user.as_ref().map(|u| &u.id) != user.as_ref().map(|u| &u.id);
        self.user = user;
        if changed {
            self.events.emit(SessionEvent::UserChanged(
                self.user.as_ref().map(|u| u.id.clone()),
            ));
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.events.emit(SessionEvent::LoadingChanged(loading));
        }
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.last_error != error {
            self.last_error = error.clone();
            self.events.emit(SessionEvent::ErrorChanged(error));
        }
    }
}

/// Resolves the user behind the active backend session, if any.
fn lookup_session<B>(backend: &B, clock: &dyn Clock) -> SessionLookup
where
    B: AuthGateway + UserRepository,
{
    match backend.current_identity() {
        Ok(identity) => {
            let seed = ProfileSeed {
                name: display_name_from_email(&identity.email),
                phone_number: None,
            };
            Ok(Some(load_profile(backend, clock, &identity, seed)))
        }
        Err(AuthError::SessionMissing) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Reads the profile row, creating it when missing. One retry, then an
/// in-memory profile.
fn load_profile<B>(
    backend: &B,
    clock: &dyn Clock,
    identity: &AuthIdentity,
    seed: ProfileSeed,
) -> User
where
    B: UserRepository + ?Sized,
{
    match backend.get_user(&identity.user_id) {
        Ok(Some(user)) => return user,
        Ok(None) => {}
        Err(err) => warn!(
            "event=profile_load module=session status=error error={}",
            err
        ),
    }

    let profile = User::synthesized(
        identity.user_id.clone(),
        seed.name,
        identity.email.clone(),
        seed.phone_number,
        clock.now(),
    );
    for attempt in 1..=PROFILE_INSERT_ATTEMPTS {
        match backend.insert_user(&profile) {
            Ok(user) => return user,
            Err(err) => {
                warn!(
                    "event=profile_create module=session status=error attempt={} error={}",
                    attempt, err
                );
                // Another writer may have created the row in the meantime.
                if let Ok(Some(user)) = backend.get_user(&identity.user_id) {
                    return user;
                }
            }
        }
    }

    warn!("event=profile_create module=session status=skip reason=synthesized");
    profile
}
