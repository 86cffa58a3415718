//! Command handlers.
//!
//! # Responsibility
//! - Build the app over whichever backend the config points at.
//! - Sign in with the supplied credentials, run one command, print the result.

use crate::commands::{
    AddTaskArgs, BoardArgs, Cli, Commands, CreateProjectArgs, MoveArgs, NotificationsArgs,
    RemoveProjectArgs, SignupArgs,
};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use log::info;
use mytask_core::service::drag::{DragPayload, DropColumn, TransferData};
use mytask_core::service::kanban::due_state;
use mytask_core::{
    AppConfig, Backend, BackendLocation, DueState, MyTaskApp, NewTask, ProjectPatch, RepoError,
    RestBackend, SqliteBackend, Task,
};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Backend(RepoError),
    MissingCredentials,
    Auth(String),
    Command(String),
    InvalidDate(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => write!(f, "configuration error: {message}"),
            Self::Backend(err) => write!(f, "could not open backend: {err}"),
            Self::MissingCredentials => {
                write!(f, "--email and --password (or MYTASK_EMAIL / MYTASK_PASSWORD) are required")
            }
            Self::Auth(message) => write!(f, "authentication failed: {message}"),
            Self::Command(message) => f.write_str(message),
            Self::InvalidDate(value) => write!(f, "invalid due date `{value}`, expected YYYY-MM-DD"),
        }
    }
}

impl std::error::Error for CliError {}

/// Resolves the backend and runs the selected command.
pub fn dispatch(cli: Cli, mut config: AppConfig) -> Result<(), CliError> {
    // One-shot runs check reminders explicitly through `remind`.
    config.reminders.enabled = false;

    match config.backend.location() {
        BackendLocation::Sqlite { path } => {
            info!(
                "event=cli_backend module=cli status=ok kind=sqlite path={}",
                path.display()
            );
            let backend = SqliteBackend::open(&path).map_err(CliError::Backend)?;
            run(Arc::new(backend), config, cli)
        }
        BackendLocation::Remote { url } => {
            let anon_key = config
                .backend
                .anon_key
                .clone()
                .ok_or_else(|| CliError::Config("backend.anon_key is required for a hosted backend".to_string()))?;
            info!("event=cli_backend module=cli status=ok kind=rest");
            run(Arc::new(RestBackend::new(url, anon_key)), config, cli)
        }
    }
}

fn run<B: Backend + 'static>(backend: Arc<B>, config: AppConfig, cli: Cli) -> Result<(), CliError> {
    let mut app = MyTaskApp::new(backend, config);
    let email = cli.email.ok_or(CliError::MissingCredentials)?;
    let password = cli.password.ok_or(CliError::MissingCredentials)?;

    if let Commands::Signup(args) = &cli.command {
        return cmd_signup(&mut app, &email, &password, args);
    }

    let outcome = app.sign_in(&email, &password);
    if !outcome.success {
        return Err(CliError::Auth(outcome.error.unwrap_or_default()));
    }

    match cli.command {
        Commands::Signup(_) => Ok(()),
        Commands::Signin => cmd_signin(&app),
        Commands::Projects => cmd_projects(&app),
        Commands::CreateProject(args) => cmd_create_project(&mut app, args),
        Commands::RemoveProject(args) => cmd_remove_project(&mut app, args),
        Commands::Board(args) => cmd_board(&mut app, args),
        Commands::AddTask(args) => cmd_add_task(&mut app, args),
        Commands::Move(args) => cmd_move(&mut app, args),
        Commands::DeleteTask(args) => {
            select(&mut app, &args.project_id)?;
            if !app.store_mut().delete_task(&args.task_id) {
                return Err(store_error(&app));
            }
            println!("deleted {}", args.task_id);
            Ok(())
        }
        Commands::Notifications(args) => cmd_notifications(&mut app, args),
        Commands::Remind => {
            let report = app.check_reminders();
            println!(
                "due soon: {}  sent: {}  failed: {}",
                report.due_tasks, report.sent, report.failed
            );
            Ok(())
        }
    }
}

fn cmd_signup<B: Backend + 'static>(
    app: &mut MyTaskApp<B>,
    email: &str,
    password: &str,
    args: &SignupArgs,
) -> Result<(), CliError> {
    let outcome = app.sign_up(email, password, &args.name, args.phone.as_deref());
    if !outcome.success {
        return Err(CliError::Auth(outcome.error.unwrap_or_default()));
    }
    cmd_signin(app)
}

fn cmd_signin<B: Backend + 'static>(app: &MyTaskApp<B>) -> Result<(), CliError> {
    let Some(user) = app.session().current_user() else {
        return Err(CliError::Auth("no active session".to_string()));
    };
    println!("signed in as {} <{}>", user.name, user.email);
    if let Some(phone) = &user.phone_number {
        println!("phone: {phone}");
    }
    Ok(())
}

fn cmd_projects<B: Backend + 'static>(app: &MyTaskApp<B>) -> Result<(), CliError> {
    if let Some(err) = app.store().last_error() {
        return Err(CliError::Command(err.to_string()));
    }
    let current = app.store().current_project_id();
    for project in app.store().projects() {
        let marker = if Some(project.id.as_str()) == current { "*" } else { " " };
        println!("{marker} {}  {}", project.id, project.name);
    }
    Ok(())
}

fn cmd_create_project<B: Backend + 'static>(
    app: &mut MyTaskApp<B>,
    args: CreateProjectArgs,
) -> Result<(), CliError> {
    let project = app
        .store_mut()
        .create_project(&args.name, &args.description)
        .ok_or_else(|| store_error(app))?;
    println!("created project {}  {}", project.id, project.name);
    Ok(())
}

fn cmd_remove_project<B: Backend + 'static>(
    app: &mut MyTaskApp<B>,
    args: RemoveProjectArgs,
) -> Result<(), CliError> {
    if args.archive {
        let patch = ProjectPatch {
            is_archived: Some(true),
            ..ProjectPatch::default()
        };
        app.store_mut()
            .update_project(&args.project_id, &patch)
            .ok_or_else(|| store_error(app))?;
        println!("archived {}", args.project_id);
    } else {
        if !app.store_mut().delete_project(&args.project_id) {
            return Err(store_error(app));
        }
        println!("deleted {}", args.project_id);
    }
    Ok(())
}

fn cmd_board<B: Backend + 'static>(app: &mut MyTaskApp<B>, args: BoardArgs) -> Result<(), CliError> {
    if let Some(project_id) = &args.project_id {
        select(app, project_id)?;
    }
    let Some(project) = app.store().current_project() else {
        println!("no projects yet");
        return Ok(());
    };
    println!("{}", project.name);

    let now = Utc::now();
    let board = app.board();
    for column in board.columns() {
        println!();
        println!("{} ({})", column.title, column.count());
        if column.is_empty() {
            println!("  -");
        }
        for task in column.tasks {
            println!("  {}", card_line(task, now));
        }
    }
    Ok(())
}

fn card_line(task: &Task, now: chrono::DateTime<Utc>) -> String {
    let due = match task.due_date {
        Some(due) => {
            let flag = match due_state(Some(due), now) {
                DueState::Overdue => " overdue",
                DueState::DueToday => " today",
                DueState::DueTomorrow => " tomorrow",
                DueState::Normal => "",
            };
            format!("  [due {}{}]", due.with_timezone(&Local).format("%Y-%m-%d"), flag)
        }
        None => String::new(),
    };
    format!("{}  {}{}", task.id, task.title, due)
}

fn cmd_add_task<B: Backend + 'static>(app: &mut MyTaskApp<B>, args: AddTaskArgs) -> Result<(), CliError> {
    select(app, &args.project_id)?;
    let now = Utc::now();
    let mut request = NewTask::new(args.project_id.clone(), args.title.clone(), now)
        .with_description(args.description.clone())
        .with_status(args.status.into());
    if let Some(due) = &args.due {
        request = request.with_due_date(parse_due_date(due)?);
    }
    if !args.unassigned {
        if let Some(user) = app.session().current_user() {
            request = request.assigned_to(user.id.clone());
        }
    }

    let task = app
        .store_mut()
        .create_task(request)
        .ok_or_else(|| store_error(app))?;
    println!("created task {}  {}", task.id, task.title);
    Ok(())
}

fn cmd_move<B: Backend + 'static>(app: &mut MyTaskApp<B>, args: MoveArgs) -> Result<(), CliError> {
    select(app, &args.project_id)?;
    let Some(task) = app.store().task(&args.task_id) else {
        return Err(CliError::Command(format!("task not found: {}", args.task_id)));
    };

    // Same path a board drop takes.
    let mut transfer = TransferData::new();
    DragPayload {
        task_id: task.id.clone(),
        status: task.status,
    }
    .write_to(&mut transfer);
    let mut column = DropColumn::new(args.to.into());
    column.drag_over();

    match app.drop_on_column(&mut column, &transfer) {
        Some(task) => {
            println!("{} -> {}", task.title, task.status);
            Ok(())
        }
        None => match app.store().last_error() {
            Some(err) => Err(CliError::Command(err.to_string())),
            None => {
                println!("already in {}", column.status());
                Ok(())
            }
        },
    }
}

fn cmd_notifications<B: Backend + 'static>(
    app: &mut MyTaskApp<B>,
    args: NotificationsArgs,
) -> Result<(), CliError> {
    if let Some(err) = app.notifications().last_error() {
        return Err(CliError::Command(err.to_string()));
    }
    let items: Vec<_> = app.notifications().notifications().to_vec();
    println!("{} unread", app.notifications().unread_count());
    for item in &items {
        let marker = if item.read { " " } else { "*" };
        println!(
            "{marker} {}  {}",
            item.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            item.message
        );
        if args.mark_read && !item.read {
            app.notifications_mut().mark_as_read(&item.id);
        }
    }
    Ok(())
}

fn select<B: Backend + 'static>(app: &mut MyTaskApp<B>, project_id: &str) -> Result<(), CliError> {
    if app.store().current_project_id() == Some(project_id) {
        return Ok(());
    }
    if app.store_mut().select_project(project_id) {
        Ok(())
    } else {
        Err(store_error(app))
    }
}

fn store_error<B: Backend + 'static>(app: &MyTaskApp<B>) -> CliError {
    CliError::Command(
        app.store()
            .last_error()
            .unwrap_or("operation failed")
            .to_string(),
    )
}

/// Parses `YYYY-MM-DD` as local noon, so the day survives timezone shifts.
fn parse_due_date(value: &str) -> Result<chrono::DateTime<Utc>, CliError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(value.to_string()))?;
    let noon = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| CliError::InvalidDate(value.to_string()))?;
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| CliError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::parse_due_date;
    use chrono::{Local, NaiveDate};

    #[test]
    fn due_date_keeps_the_local_calendar_day() {
        let due = parse_due_date("2026-04-02").expect("valid date");
        assert_eq!(
            due.with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2026, 4, 2).unwrap()
        );
    }

    #[test]
    fn malformed_due_date_is_rejected() {
        assert!(parse_due_date("02/04/2026").is_err());
        assert!(parse_due_date("2026-13-01").is_err());
    }
}
