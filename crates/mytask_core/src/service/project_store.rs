//! Project/task state store.
//!
//! # Responsibility
//! - Own the in-memory project list, the current project and its tasks for
//!   the signed-in user.
//! - Mirror every successful backend mutation into those collections and the
//!   task cache.
//! - Fire best-effort task notifications.
//!
//! # Invariants
//! - At most one current project; `tasks` belongs to it (or is empty).
//! - Operations never return errors: failures set `last_error` and yield
//!   `None`/`false`.
//! - The loading flag is raised for every backend dispatch and lowered when
//!   it resolves, success or failure.
//! - Only a status transition into `Done` from another status notifies on
//!   update.

use crate::clock::Clock;
use crate::model::project::{NewProject, Project, ProjectId, ProjectPatch};
use crate::model::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::model::user::UserId;
use crate::repo::{ProjectRepository, RepoError, TaskRepository};
use crate::service::events::EventHub;
use crate::service::kanban::KanbanBoard;
use crate::service::notifier::TaskNotifier;
use crate::service::task_cache::TaskCache;
use chrono::Duration;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

const FALLBACK_PROJECT_NAME: &str = "a project";

/// Change signal published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    ProjectsChanged,
    CurrentProjectChanged(Option<ProjectId>),
    TasksChanged,
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
}

/// Internal failure of one store operation.
#[derive(Debug)]
pub enum StoreError {
    NotSignedIn,
    Repo(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSignedIn => write!(f, "no user is signed in"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotSignedIn => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum TaskNotice {
    Created,
    Completed,
}

impl TaskNotice {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Completed => "completed",
        }
    }
}

pub struct ProjectStore<B> {
    backend: Arc<B>,
    notifier: Arc<dyn TaskNotifier>,
    clock: Arc<dyn Clock>,
    user_id: Option<UserId>,
    projects: Vec<Project>,
    current: Option<Project>,
    tasks: Vec<Task>,
    cache: TaskCache,
    loading_depth: usize,
    last_error: Option<String>,
    events: EventHub<StoreEvent>,
}

impl<B> ProjectStore<B>
where
    B: ProjectRepository + TaskRepository,
{
    pub fn new(
        backend: Arc<B>,
        notifier: Arc<dyn TaskNotifier>,
        clock: Arc<dyn Clock>,
        cache_freshness: Duration,
    ) -> Self {
        Self {
            backend,
            notifier,
            clock,
            user_id: None,
            projects: Vec::new(),
            current: None,
            tasks: Vec::new(),
            cache: TaskCache::new(cache_freshness),
            loading_depth: 0,
            last_error: None,
            events: EventHub::default(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current.as_ref()
    }

    pub fn current_project_id(&self) -> Option<&str> {
        self.current.as_ref().map(|project| project.id.as_str())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Board partitions of the current task list.
    pub fn board(&self) -> KanbanBoard {
        KanbanBoard::from_tasks(&self.tasks)
    }

    pub fn is_loading(&self) -> bool {
        self.loading_depth > 0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn cache(&self) -> &TaskCache {
        &self.cache
    }

    /// Switches the principal. Clears all state and, for a signed-in user,
    /// loads their projects.
    pub fn set_user(&mut self, user_id: Option<UserId>) {
        if self.user_id == user_id {
            return;
        }
        self.user_id = user_id;
        self.projects.clear();
        self.current = None;
        self.tasks.clear();
        self.cache.clear();
        self.events.emit(StoreEvent::ProjectsChanged);
        self.events.emit(StoreEvent::CurrentProjectChanged(None));
        self.events.emit(StoreEvent::TasksChanged);
        if self.user_id.is_some() {
            self.fetch_projects();
        }
    }

    /// Loads the user's non-archived projects, newest first. Selects the
    /// first one when nothing is selected.
    pub fn fetch_projects(&mut self) -> bool {
        let Some(user_id) = self.user_id.clone() else {
            debug!("event=fetch_projects module=project_store status=skip reason=no_user");
            return false;
        };
        let Some(projects) = self.run("fetch_projects", "Could not load projects", |store| {
            Ok(store.backend.list_projects(&user_id)?)
        }) else {
            return false;
        };

        info!(
            "event=fetch_projects module=project_store status=ok count={}",
            projects.len()
        );
        self.projects = projects;
        self.events.emit(StoreEvent::ProjectsChanged);

        if self.current.is_none() {
            if let Some(first) = self.projects.first().cloned() {
                self.set_current_project(Some(first));
            }
        }
        true
    }

    /// Changes the selection and reloads (or clears) the task list.
    ///
    /// Switching to a different project empties the task list first, so a
    /// failed load never leaves another project's tasks in view.
    pub fn set_current_project(&mut self, project: Option<Project>) {
        let project_id = project.as_ref().map(|project| project.id.clone());
        let switched = self.current_project_id() != project_id.as_deref();
        self.current = project;
        self.events
            .emit(StoreEvent::CurrentProjectChanged(project_id.clone()));

        if switched || project_id.is_none() {
            self.tasks.clear();
            self.events.emit(StoreEvent::TasksChanged);
        }
        if let Some(project_id) = project_id {
            self.fetch_tasks(&project_id);
        }
    }

    /// Selects a project from the loaded list by id.
    pub fn select_project(&mut self, project_id: &str) -> bool {
        match self.projects.iter().find(|p| p.id == project_id).cloned() {
            Some(project) => {
                self.set_current_project(Some(project));
                true
            }
            None => {
                self.set_error(Some(format!("Project not found: {project_id}")));
                false
            }
        }
    }

    /// Loads a project's tasks, served from the cache while it is fresh.
    pub fn fetch_tasks(&mut self, project_id: &str) -> bool {
        let now = self.clock.now();
        if let Some(cached) = self.cache.fresh(project_id, now) {
            self.tasks = cached.to_vec();
            debug!(
                "event=fetch_tasks module=project_store status=ok source=cache project_id={} count={}",
                project_id,
                self.tasks.len()
            );
            self.events.emit(StoreEvent::TasksChanged);
            return true;
        }

        let Some(tasks) = self.run("fetch_tasks", "Could not load tasks", |store| {
            Ok(store.backend.list_tasks(project_id)?)
        }) else {
            return false;
        };

        debug!(
            "event=fetch_tasks module=project_store status=ok source=backend project_id={} count={}",
            project_id,
            tasks.len()
        );
        self.cache.store(project_id, tasks.clone(), now);
        self.tasks = tasks;
        self.events.emit(StoreEvent::TasksChanged);
        true
    }

    /// Creates a project owned by the current user and makes it current.
    pub fn create_project(&mut self, name: &str, description: &str) -> Option<Project> {
        let Some(user_id) = self.user_id.clone() else {
            self.fail("create_project", "Could not create the project", StoreError::NotSignedIn);
            return None;
        };
        let request = NewProject::new(name, description, user_id, self.clock.now());
        let project = self.run("create_project", "Could not create the project", |store| {
            Ok(store.backend.create_project(&request)?)
        })?;

        info!(
            "event=create_project module=project_store status=ok project_id={}",
            project.id
        );
        self.projects.push(project.clone());
        self.events.emit(StoreEvent::ProjectsChanged);
        self.set_current_project(Some(project.clone()));
        Some(project)
    }

    /// Applies a partial update. An archived project leaves the list.
    pub fn update_project(&mut self, project_id: &str, patch: &ProjectPatch) -> Option<Project> {
        let updated = self.run("update_project", "Could not update the project", |store| {
            Ok(store.backend.update_project(project_id, patch)?)
        })?;

        if updated.is_archived {
            self.projects.retain(|project| project.id != project_id);
            self.events.emit(StoreEvent::ProjectsChanged);
            if self.current_project_id() == Some(project_id) {
                let next = self.projects.first().cloned();
                self.set_current_project(next);
            }
            return Some(updated);
        }

        for project in self.projects.iter_mut().filter(|p| p.id == project_id) {
            *project = updated.clone();
        }
        self.events.emit(StoreEvent::ProjectsChanged);
        if self.current_project_id() == Some(project_id) {
            self.current = Some(updated.clone());
            self.events
                .emit(StoreEvent::CurrentProjectChanged(Some(updated.id.clone())));
        }
        Some(updated)
    }

    /// Deletes a project and its tasks. A deleted current project is
    /// replaced by the first remaining one, or none.
    ///
    /// Once the tasks are gone they also leave the cache and the live list,
    /// even when the project row itself cannot be deleted afterwards.
    pub fn delete_project(&mut self, project_id: &str) -> bool {
        let Some(removed_tasks) = self.run("delete_project", "Could not delete the project", |store| {
            Ok(store.backend.delete_tasks_for_project(project_id)?)
        }) else {
            return false;
        };
        self.drop_project_tasks(project_id);

        if self
            .run("delete_project", "Could not delete the project", |store| {
                Ok(store.backend.delete_project(project_id)?)
            })
            .is_none()
        {
            return false;
        }

        info!(
            "event=delete_project module=project_store status=ok project_id={} removed_tasks={}",
            project_id, removed_tasks
        );
        self.projects.retain(|project| project.id != project_id);
        self.events.emit(StoreEvent::ProjectsChanged);

        if self.current_project_id() == Some(project_id) {
            let next = self.projects.first().cloned();
            self.set_current_project(next);
        }
        true
    }

    /// Persists a task. It joins the live list only when it belongs to the
    /// current project.
    pub fn create_task(&mut self, task: NewTask) -> Option<Task> {
        let created = self.run("create_task", "Could not create the task", |store| {
            Ok(store.backend.create_task(&task)?)
        })?;

        let project_id = created.project_id.clone();
        if self.current_project_id() == Some(project_id.as_str()) {
            self.tasks.push(created.clone());
            self.cache
                .edit(&project_id, |tasks| tasks.push(created.clone()));
            self.events.emit(StoreEvent::TasksChanged);
        } else {
            self.cache.invalidate(&project_id);
        }

        self.notify(TaskNotice::Created, &created);
        Some(created)
    }

    /// Applies a partial update. A transition into `Done` notifies once.
    pub fn update_task(&mut self, task_id: &str, patch: &TaskPatch) -> Option<Task> {
        let known_status = self.task(task_id).map(|task| task.status);
        let completing = patch.status == Some(TaskStatus::Done);

        let (previous_status, updated) =
            self.run("update_task", "Could not update the task", |store| {
                let previous = match known_status {
                    Some(status) => Some(status),
                    None if completing => store.backend.get_task(task_id)?.map(|t| t.status),
                    None => None,
                };
                let updated = store.backend.update_task(task_id, patch)?;
                Ok((previous, updated))
            })?;

        self.reflect_task(&updated);

        let completed = previous_status.is_some_and(|status| !status.is_done())
            && updated.status.is_done();
        if completed {
            self.notify(TaskNotice::Completed, &updated);
        }
        Some(updated)
    }

    /// Drag-originated status change. Moving to the current status is a
    /// no-op that touches neither the backend nor the notifier.
    pub fn move_task(&mut self, task_id: &str, status: TaskStatus) -> Option<Task> {
        if let Some(task) = self.task(task_id).filter(|task| task.status == status) {
            debug!(
                "event=move_task module=project_store status=skip reason=same_status task_id={}",
                task_id
            );
            return Some(task.clone());
        }
        self.update_task(task_id, &TaskPatch::status(status))
    }

    pub fn delete_task(&mut self, task_id: &str) -> bool {
        if self
            .run("delete_task", "Could not delete the task", |store| {
                Ok(store.backend.delete_task(task_id)?)
            })
            .is_none()
        {
            return false;
        }

        self.tasks.retain(|task| task.id != task_id);
        self.cache.forget_task(task_id);
        self.events.emit(StoreEvent::TasksChanged);
        true
    }

    fn drop_project_tasks(&mut self, project_id: &str) {
        self.cache.invalidate(project_id);
        let before = self.tasks.len();
        self.tasks.retain(|task| task.project_id != project_id);
        if self.tasks.len() != before {
            self.events.emit(StoreEvent::TasksChanged);
        }
    }

    fn reflect_task(&mut self, updated: &Task) {
        if updated.is_archived {
            self.tasks.retain(|task| task.id != updated.id);
            self.cache.forget_task(&updated.id);
        } else {
            for task in self.tasks.iter_mut().filter(|task| task.id == updated.id) {
                *task = updated.clone();
            }
            self.cache.edit(&updated.project_id, |tasks| {
                for task in tasks.iter_mut().filter(|task| task.id == updated.id) {
                    *task = updated.clone();
                }
            });
        }
        self.events.emit(StoreEvent::TasksChanged);
    }

    fn project_name_for(&self, project_id: &str) -> String {
        if let Some(project) = self
            .current
            .iter()
            .chain(self.projects.iter())
            .find(|project| project.id == project_id)
        {
            return project.name.clone();
        }
        match self.backend.get_project(project_id) {
            Ok(Some(project)) => project.name,
            Ok(None) => FALLBACK_PROJECT_NAME.to_string(),
            Err(err) => {
                warn!(
                    "event=resolve_project_name module=project_store status=error project_id={} error={}",
                    project_id, err
                );
                FALLBACK_PROJECT_NAME.to_string()
            }
        }
    }

    fn notify(&self, notice: TaskNotice, task: &Task) {
        let Some(user_id) = self.user_id.as_deref() else {
            return;
        };
        let project_name = self.project_name_for(&task.project_id);
        let outcome = match notice {
            TaskNotice::Created => self.notifier.task_created(user_id, task, &project_name),
            TaskNotice::Completed => self.notifier.task_completed(user_id, task, &project_name),
        };
        if outcome.success {
            info!(
                "event=task_notification module=project_store status=ok kind={} task_id={}",
                notice.as_str(),
                task.id
            );
        } else {
            warn!(
                "event=task_notification module=project_store status=error kind={} task_id={} error={}",
                notice.as_str(),
                task.id,
                outcome.error.as_deref().unwrap_or("unknown")
            );
        }
    }

    /// Wraps one backend dispatch with the loading flag and error state.
    fn run<T>(
        &mut self,
        operation: &'static str,
        context: &str,
        work: impl FnOnce(&mut Self) -> Result<T, StoreError>,
    ) -> Option<T> {
        self.set_error(None);
        self.begin_loading();
        let result = work(self);
        self.end_loading();
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.fail(operation, context, err);
                None
            }
        }
    }

    fn fail(&mut self, operation: &'static str, context: &str, err: StoreError) {
        warn!(
            "event={} module=project_store status=error error={}",
            operation, err
        );
        self.set_error(Some(format!("{context}: {err}")));
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.last_error != error {
            self.last_error = error.clone();
            self.events.emit(StoreEvent::ErrorChanged(error));
        }
    }

    fn begin_loading(&mut self) {
        self.loading_depth += 1;
        if self.loading_depth == 1 {
            self.events.emit(StoreEvent::LoadingChanged(true));
        }
    }

    fn end_loading(&mut self) {
        self.loading_depth = self.loading_depth.saturating_sub(1);
        if self.loading_depth == 0 {
            self.events.emit(StoreEvent::LoadingChanged(false));
        }
    }
}
