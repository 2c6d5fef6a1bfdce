use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

/// Administrative CLI for the tutela scheduler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Acting user id (falls back to default_user from the config)
    #[clap(long, global = true)]
    pub user: Option<Uuid>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task with its subtask checklist
    Add(AddCommand),
    /// List tasks for a day or the planning window
    List(ListCommand),
    /// Show one task with its subtask checklist
    Show(ShowCommand),
    /// Edit a task or its whole recurring series
    Edit(EditCommand),
    /// Delete a task or the future of its series
    Delete(DeleteCommand),
    /// Mark a subtask as completed
    Check(CheckCommand),
    /// Mark a subtask as pending again
    Uncheck(CheckCommand),
    /// Manage user absences
    Absence(AbsenceCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// The description of the task
    #[clap(short, long)]
    pub description: Option<String>,
    /// Scheduled date (YYYY-MM-DD)
    #[clap(long)]
    pub date: Option<String>,
    /// Scheduled time (HH:MM)
    #[clap(long)]
    pub time: Option<String>,
    /// Color tag (e.g. '#ffaa00')
    #[clap(long)]
    pub color: Option<String>,
    /// Estimated duration in minutes
    #[clap(long)]
    pub duration: Option<i64>,
    /// Path of a pictogram image to attach
    #[clap(long)]
    pub pictogram: Option<String>,
    /// Subtask titles; at least one is required
    #[clap(short, long = "subtask", num_args = 1..)]
    pub subtasks: Vec<String>,
    /// Make the task repeat weekly
    #[clap(long)]
    pub recurrent: bool,
    /// Days of week for the recurrence (mon,tue,...,sun or full names)
    #[clap(long, help = "Days of week (e.g. 'monday,thursday')")]
    pub on: Option<String>,
    /// Recurrence start date (defaults to the scheduled date)
    #[clap(long)]
    pub from: Option<String>,
    /// Recurrence end date (defaults to six months after the start)
    #[clap(long)]
    pub until: Option<String>,
    /// Enable reminder notifications
    #[clap(long)]
    pub notify: bool,
    /// Reminder lead time in minutes
    #[clap(long)]
    pub remind: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// List tasks for this date instead of today (YYYY-MM-DD)
    #[clap(long)]
    pub date: Option<String>,
    /// List the planning window instead of a single day
    #[clap(long)]
    pub planned: bool,
    /// Planning window length in days (defaults to the config value)
    #[clap(long, requires = "planned")]
    pub days: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// The ID (or unique prefix) of the task
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID (or unique prefix) of the task to edit
    pub id: String,

    /// Apply recurrence changes to the whole series
    #[arg(long)]
    pub series: bool,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, conflicts_with = "color")]
    pub color_clear: bool,

    /// New scheduled date; ignored together with --series
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub time: Option<String>,
    #[arg(long, conflicts_with = "time")]
    pub time_clear: bool,

    #[arg(long)]
    pub duration: Option<i64>,

    #[arg(long)]
    pub position: Option<i64>,

    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// New weekday pattern for the series
    #[arg(long)]
    pub on: Option<String>,
    /// New series start date
    #[arg(long)]
    pub from: Option<String>,
    /// New series end date
    #[arg(long)]
    pub until: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID (or unique prefix) of the task to delete
    pub id: String,
    /// Also delete every future occurrence of the series
    #[clap(long)]
    pub series: bool,
    /// Skip the confirmation prompt
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CheckCommand {
    /// The ID (or unique prefix) of the subtask
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct AbsenceCommand {
    #[command(subcommand)]
    pub action: AbsenceAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AbsenceAction {
    /// Record an absence day
    Add {
        /// The absent date (YYYY-MM-DD)
        date: String,
        /// vacation or legal_absence
        #[clap(long, value_enum, default_value = "vacation")]
        kind: AbsenceKindArg,
        #[clap(long)]
        note: Option<String>,
    },
    /// Remove a recorded absence
    Remove {
        /// The full ID of the absence (see `absence list`)
        id: Uuid,
    },
    /// List recorded absences
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StatusArg {
    Pending,
    Completed,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum AbsenceKindArg {
    Vacation,
    #[value(name = "legal_absence", alias = "legal")]
    LegalAbsence,
}
