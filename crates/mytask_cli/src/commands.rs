//! Command-line surface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use mytask_core::TaskStatus;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mytask", about = "Kanban projects and tasks from the terminal", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true, env = "MYTASK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Account email
    #[arg(long, global = true, env = "MYTASK_EMAIL")]
    pub email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "MYTASK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log level override (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Signup(SignupArgs),
    /// Check credentials and show the profile
    Signin,
    /// List projects
    Projects,
    /// Create a project and make it current
    CreateProject(CreateProjectArgs),
    /// Archive or delete a project
    RemoveProject(RemoveProjectArgs),
    /// Show the kanban board of a project
    Board(BoardArgs),
    /// Add a task to a project
    AddTask(AddTaskArgs),
    /// Move a task to another column
    Move(MoveArgs),
    /// Delete a task
    DeleteTask(DeleteTaskArgs),
    /// List in-app notifications
    Notifications(NotificationsArgs),
    /// Send due-soon reminders now
    Remind,
}

#[derive(Args)]
pub struct SignupArgs {
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Phone number for SMS notifications
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Args)]
pub struct CreateProjectArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args)]
pub struct RemoveProjectArgs {
    pub project_id: String,
    /// Archive instead of deleting project and tasks
    #[arg(long)]
    pub archive: bool,
}

#[derive(Args)]
pub struct BoardArgs {
    /// Project id; defaults to the newest project
    pub project_id: Option<String>,
}

#[derive(Args)]
pub struct AddTaskArgs {
    pub project_id: String,
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Due date as YYYY-MM-DD (local time)
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, value_enum, default_value_t = StatusArg::Todo)]
    pub status: StatusArg,
    /// Leave the task unassigned instead of assigning it to yourself
    #[arg(long)]
    pub unassigned: bool,
}

#[derive(Args)]
pub struct MoveArgs {
    pub project_id: String,
    pub task_id: String,
    #[arg(value_enum)]
    pub to: StatusArg,
}

#[derive(Args)]
pub struct DeleteTaskArgs {
    pub project_id: String,
    pub task_id: String,
}

#[derive(Args)]
pub struct NotificationsArgs {
    /// Mark every listed notification as read
    #[arg(long)]
    pub mark_read: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Todo,
    Doing,
    Done,
}

impl From<StatusArg> for TaskStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Todo => TaskStatus::Todo,
            StatusArg::Doing => TaskStatus::Doing,
            StatusArg::Done => TaskStatus::Done,
        }
    }
}
