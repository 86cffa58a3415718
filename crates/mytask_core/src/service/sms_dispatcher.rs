//! Notification/SMS dispatcher.
//!
//! # Responsibility
//! - Render task notification texts and hand them to the SMS provider.
//! - Resolve the recipient number per delivery mode.
//! - Record every attempt in the SMS audit log.
//!
//! # Invariants
//! - No public entry point returns an error; outcomes are values.
//! - A missing provider configuration degrades to a reported failure.
//! - Logs carry masked phone numbers only.

use crate::clock::Clock;
use crate::config::{DeliveryMode, SmsConfig};
use crate::model::notification::{SmsDeliveryStatus, SmsLogEntry};
use crate::model::task::Task;
use crate::model::validation::mask_phone_number;
use crate::repo::{SmsLogRepository, UserRepository};
use crate::service::notifier::{DispatchOutcome, TaskNotifier};
use crate::service::sms_provider::{SmsError, SmsProvider, TwilioProvider};
use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use std::sync::Arc;

/// Recipient policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySettings {
    pub mode: DeliveryMode,
    /// Only number a sandbox account may reach.
    pub verified_number: Option<String>,
}

impl From<&SmsConfig> for DeliverySettings {
    fn from(config: &SmsConfig) -> Self {
        Self {
            mode: config.mode,
            verified_number: config
                .verified_number
                .clone()
                .filter(|number| !number.trim().is_empty()),
        }
    }
}

pub fn task_created_message(task_title: &str, project_name: &str) -> String {
    format!("MyTask: New task \"{task_title}\" was created in project \"{project_name}\".")
}

pub fn task_completed_message(task_title: &str, project_name: &str) -> String {
    format!("MyTask: Task \"{task_title}\" in project \"{project_name}\" has been completed.")
}

/// Due date is rendered as a local calendar date.
pub fn task_due_soon_message(
    task_title: &str,
    project_name: &str,
    due_date: DateTime<Utc>,
) -> String {
    let due = due_date.with_timezone(&Local).format("%Y-%m-%d");
    format!("MyTask: Reminder! Task \"{task_title}\" in project \"{project_name}\" is due on {due}.")
}

/// Rewrites provider errors about unverified recipients into an actionable
/// message; other errors pass through as their display text.
pub fn describe_send_error(error: &SmsError, phone_number: &str) -> String {
    let text = error.to_string();
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("not a verified") || lowered.contains("unverified") {
        return format!(
            "The number {} is not verified on this SMS account. Verify it in the provider console or upgrade the account.",
            mask_phone_number(phone_number)
        );
    }
    text
}

/// Sends task notifications as SMS and records each attempt.
pub struct SmsDispatcher<B> {
    backend: Arc<B>,
    provider: Option<Box<dyn SmsProvider>>,
    settings: DeliverySettings,
    clock: Arc<dyn Clock>,
}

impl<B> SmsDispatcher<B>
where
    B: UserRepository + SmsLogRepository,
{
    pub fn new(
        backend: Arc<B>,
        provider: Option<Box<dyn SmsProvider>>,
        settings: DeliverySettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            provider,
            settings,
            clock,
        }
    }

    /// Builds the HTTPS provider when the configuration is complete.
    pub fn from_config(backend: Arc<B>, config: &SmsConfig, clock: Arc<dyn Clock>) -> Self {
        let provider = TwilioProvider::from_config(config)
            .map(|provider| Box::new(provider) as Box<dyn SmsProvider>);
        if provider.is_none() {
            warn!("event=sms_provider_init module=sms status=skip reason=incomplete_config");
        }
        Self::new(backend, provider, DeliverySettings::from(config), clock)
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Verified number in sandbox mode, the user's stored number in
    /// production mode.
    pub fn resolve_phone_number(&self, user_id: &str) -> Option<String> {
        match self.settings.mode {
            DeliveryMode::Sandbox => self.settings.verified_number.clone(),
            DeliveryMode::Production => match self.backend.get_user(user_id) {
                Ok(Some(user)) => user.phone_number.filter(|number| !number.trim().is_empty()),
                Ok(None) => None,
                Err(err) => {
                    warn!(
                        "event=sms_resolve_phone module=sms status=error error={}",
                        err
                    );
                    None
                }
            },
        }
    }

    /// Sends `message` to `phone_number` and writes an audit row.
    pub fn send_sms(
        &self,
        user_id: Option<&str>,
        phone_number: &str,
        message: &str,
    ) -> DispatchOutcome {
        let result = match &self.provider {
            Some(provider) => provider.send(phone_number, message),
            None => Err(SmsError::NotConfigured),
        };

        let (outcome, entry_status, provider_message_id) = match result {
            Ok(sent) => {
                info!(
                    "event=sms_send module=sms status=ok to={}",
                    mask_phone_number(phone_number)
                );
                (
                    DispatchOutcome::sent(sent.message_id.clone()),
                    SmsDeliveryStatus::Sent,
                    Some(sent.message_id),
                )
            }
            Err(err) => {
                let description = describe_send_error(&err, phone_number);
                warn!(
                    "event=sms_send module=sms status=error to={} error={}",
                    mask_phone_number(phone_number),
                    err
                );
                (
                    DispatchOutcome::failed(description),
                    SmsDeliveryStatus::Failed,
                    None,
                )
            }
        };

        let entry = SmsLogEntry {
            user_id: user_id.map(str::to_string),
            phone_number: phone_number.to_string(),
            message: message.to_string(),
            status: entry_status,
            provider_message_id,
            error: outcome.error.clone(),
            created_at: self.clock.now(),
        };
        if let Err(err) = self.backend.insert_sms_log(&entry) {
            warn!("event=sms_log_write module=sms status=error error={}", err);
        }

        outcome
    }

    fn send_to_user(&self, user_id: &str, message: String) -> DispatchOutcome {
        match self.resolve_phone_number(user_id) {
            Some(phone_number) => self.send_sms(Some(user_id), &phone_number, &message),
            None => {
                warn!("event=sms_send module=sms status=skip reason=no_recipient");
                DispatchOutcome::failed(SmsError::MissingRecipient.to_string())
            }
        }
    }
}

impl<B> TaskNotifier for SmsDispatcher<B>
where
    B: UserRepository + SmsLogRepository,
{
    fn task_created(&self, user_id: &str, task: &Task, project_name: &str) -> DispatchOutcome {
        self.send_to_user(user_id, task_created_message(&task.title, project_name))
    }

    fn task_completed(&self, user_id: &str, task: &Task, project_name: &str) -> DispatchOutcome {
        self.send_to_user(user_id, task_completed_message(&task.title, project_name))
    }

    fn task_due_soon(
        &self,
        user_id: &str,
        task: &Task,
        project_name: &str,
        due_date: DateTime<Utc>,
    ) -> DispatchOutcome {
        self.send_to_user(
            user_id,
            task_due_soon_message(&task.title, project_name, due_date),
        )
    }
}
