//! In-app notification state for the signed-in user.

use crate::clock::Clock;
use crate::model::notification::{NewNotification, Notification};
use crate::model::project::ProjectId;
use crate::model::task::TaskId;
use crate::model::user::UserId;
use crate::repo::{NotificationRepository, RepoError};
use crate::service::events::EventHub;
use log::warn;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Changed,
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
}

/// Notification list with unread tracking. Failures are reported through
/// `last_error`, never returned.
pub struct NotificationCenter<B> {
    backend: Arc<B>,
    clock: Arc<dyn Clock>,
    user_id: Option<UserId>,
    notifications: Vec<Notification>,
    loading: bool,
    last_error: Option<String>,
    events: EventHub<NotificationEvent>,
}

impl<B: NotificationRepository> NotificationCenter<B> {
    pub fn new(backend: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            user_id: None,
            notifications: Vec::new(),
            loading: false,
            last_error: None,
            events: EventHub::default(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Switches the recipient and reloads, or clears for `None`.
    pub fn set_user(&mut self, user_id: Option<UserId>) {
        if self.user_id == user_id {
            return;
        }
        self.user_id = user_id;
        self.notifications.clear();
        self.events.emit(NotificationEvent::Changed);
        if self.user_id.is_some() {
            self.fetch();
        }
    }

    /// Reloads the user's notifications, newest first.
    pub fn fetch(&mut self) -> bool {
        let Some(user_id) = self.user_id.clone() else {
            return false;
        };
        let Some(items) = self.run("fetch_notifications", "Could not load notifications", |backend| {
            backend.list_notifications(&user_id)
        }) else {
            return false;
        };
        self.notifications = items;
        self.events.emit(NotificationEvent::Changed);
        true
    }

    pub fn mark_as_read(&mut self, notification_id: &str) -> bool {
        let Some(updated) = self.run("mark_notification_read", "Could not update the notification", |backend| {
            backend.mark_notification_read(notification_id)
        }) else {
            return false;
        };
        for item in self
            .notifications
            .iter_mut()
            .filter(|item| item.id == notification_id)
        {
            *item = updated.clone();
        }
        self.events.emit(NotificationEvent::Changed);
        true
    }

    pub fn delete(&mut self, notification_id: &str) -> bool {
        if self
            .run("delete_notification", "Could not delete the notification", |backend| {
                backend.delete_notification(notification_id)
            })
            .is_none()
        {
            return false;
        }
        self.notifications.retain(|item| item.id != notification_id);
        self.events.emit(NotificationEvent::Changed);
        true
    }

    /// Stores a notification for the current user and prepends it.
    pub fn create(
        &mut self,
        message: &str,
        related_task_id: Option<TaskId>,
        related_project_id: Option<ProjectId>,
    ) -> Option<Notification> {
        let Some(user_id) = self.user_id.clone() else {
            self.set_error(Some("Could not create the notification: no user is signed in".to_string()));
            return None;
        };
        let mut request = NewNotification::new(user_id, message, self.clock.now());
        request.related_task_id = related_task_id;
        request.related_project_id = related_project_id;

        let created = self.run("create_notification", "Could not create the notification", |backend| {
            backend.create_notification(&request)
        })?;
        self.notifications.insert(0, created.clone());
        self.events.emit(NotificationEvent::Changed);
        Some(created)
    }

    fn run<T>(
        &mut self,
        operation: &'static str,
        context: &str,
        work: impl FnOnce(&B) -> Result<T, RepoError>,
    ) -> Option<T> {
        self.set_error(None);
        self.set_loading(true);
        let result = work(self.backend.as_ref());
        self.set_loading(false);
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "event={} module=notification_center status=error error={}",
                    operation, err
                );
                self.set_error(Some(format!("{context}: {err}")));
                None
            }
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.events.emit(NotificationEvent::LoadingChanged(loading));
        }
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.last_error != error {
            self.last_error = error.clone();
            self.events.emit(NotificationEvent::ErrorChanged(error));
        }
    }
}
