use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum AbsenceKind {
    Vacation,
    LegalAbsence,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid absence kind: {0}")]
pub struct ParseAbsenceKindError(String);

impl FromStr for AbsenceKind {
    type Err = ParseAbsenceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vacation" => Ok(AbsenceKind::Vacation),
            "legal_absence" | "legal" => Ok(AbsenceKind::LegalAbsence),
            _ => Err(ParseAbsenceKindError(s.to_string())),
        }
    }
}

/// A unit of work assigned to exactly one end user.
///
/// A task is either standalone or one dated occurrence of a recurring
/// family, in which case `recurrent_task_id` points at the family
/// definition and `scheduled_date` carries the occurrence date.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Management user who assigned the task, when not self-created.
    pub assigned_by: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub estimated_minutes: Option<i64>,
    pub pictogram: Option<String>,
    pub position: i64,
    pub status: TaskStatus,
    pub recurrent_task_id: Option<Uuid>,
    pub notifications_enabled: bool,
    pub reminder_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A checklist item owned by exactly one task.
///
/// `external_id` is the client-stable correlation key: form submissions
/// carry it back so edits can be matched to persisted rows even when the
/// database id never reached the client.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub external_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub note: Option<String>,
    pub position: i64,
    pub status: TaskStatus,
    pub pictogram: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The recurrence definition shared by a family of task occurrences.
///
/// `days_of_week` is persisted as a JSON list of lowercase weekday names;
/// parse it with [`crate::schedule::WeekdaySet::from_stored`]. A NULL end
/// date means open-ended, expanded to a bounded default horizon at
/// generation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurrentTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub days_of_week: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A dated record of a user being unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAbsence {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub kind: AbsenceKind,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An uploaded attachment (pictogram) not yet handed to the store.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One submitted subtask row, as it arrives from a create or edit form.
#[derive(Debug, Clone, Default)]
pub struct SubtaskInput {
    /// Correlation key; absent means "this row is new".
    pub external_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub note: Option<String>,
    pub position: Option<i64>,
    pub status: Option<TaskStatus>,
    pub pictogram: Option<NewAttachment>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub estimated_minutes: Option<i64>,
    pub pictogram: Option<NewAttachment>,
    pub assigned_by: Option<Uuid>,
    pub position: Option<i64>,
    pub status: Option<TaskStatus>,
    pub notifications_enabled: bool,
    pub reminder_minutes: Option<i64>,
    pub subtasks: Vec<SubtaskInput>,
    pub is_recurrent: bool,
    /// Weekday names for the recurrence pattern; unrecognized names are
    /// dropped during parsing.
    pub days_of_week: Vec<String>,
    pub recurrent_start_date: Option<NaiveDate>,
    pub recurrent_end_date: Option<NaiveDate>,
}

/// Partial-update payload: every absent field keeps its persisted value.
///
/// Double-`Option` fields distinguish "leave alone" (`None`) from "set to
/// NULL" (`Some(None)`). `scheduled_date` is single-layered on purpose: a
/// series edit never moves instance dates, so there is no clear-to-NULL
/// form either.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskData {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<Option<NaiveTime>>,
    pub estimated_minutes: Option<Option<i64>>,
    pub pictogram: Option<NewAttachment>,
    pub position: Option<i64>,
    pub status: Option<TaskStatus>,
    pub notifications_enabled: Option<bool>,
    pub reminder_minutes: Option<Option<i64>>,
    /// When present, the full submitted subtask set; rows omitted from it
    /// are deleted during synchronization.
    pub subtasks: Option<Vec<SubtaskInput>>,
    pub days_of_week: Option<Vec<String>>,
    pub recurrent_start_date: Option<NaiveDate>,
    pub recurrent_end_date: Option<NaiveDate>,
}

/// A task with its subtasks and recurrence definition eager-loaded.
#[derive(Debug, Clone)]
pub struct TaskDetail {
    pub task: Task,
    pub subtasks: Vec<Subtask>,
    pub recurrence: Option<RecurrentTask>,
}

/// What an update produced: the single edited task, or the family's
/// reconciled future occurrences when the edit applied to the series.
#[derive(Debug)]
pub enum UpdateOutcome {
    Single(TaskDetail),
    Series(Vec<TaskDetail>),
}
