use crate::attachments::AttachmentStore;
use crate::clock::Clock;
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    AbsenceKind, NewTaskData, Subtask, Task, TaskDetail, TaskStatus, UpdateOutcome,
    UpdateTaskData, UserAbsence,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

// Re-export domain modules
pub mod absences;
pub mod queries;
pub mod subtasks;
pub mod tasks;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for task operations, including the recurrence
/// reconciliation engine.
#[async_trait]
pub trait TaskRepository {
    /// Creates a task (and, for recurring tasks, its whole occurrence
    /// family) atomically. See the module docs in `tasks` for the rules.
    async fn create_task(&self, user_id: Uuid, data: NewTaskData) -> Result<TaskDetail, CoreError>;
    /// Applies a partial update; with `edit_series` the family's future
    /// occurrences are reconciled against the new recurrence definition.
    async fn update_task(
        &self,
        task_id: Uuid,
        data: UpdateTaskData,
        edit_series: bool,
    ) -> Result<UpdateOutcome, CoreError>;
    /// Deletes one task, or every today-or-later occurrence of its family.
    async fn delete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        delete_series: bool,
    ) -> Result<(), CoreError>;
    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError>;
    async fn find_task_detail(&self, id: Uuid) -> Result<Option<TaskDetail>, CoreError>;
    async fn find_tasks_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Task>, CoreError>;
}

/// Domain-specific trait for subtask status workflow.
#[async_trait]
pub trait SubtaskRepository {
    /// Sets a subtask's status and propagates completion state to the
    /// parent task (all-siblings-completed / reopen rules).
    async fn update_subtask_status(
        &self,
        subtask_id: Uuid,
        status: TaskStatus,
        acting_user: Uuid,
    ) -> Result<Subtask, CoreError>;
    async fn find_subtask_by_id(&self, id: Uuid) -> Result<Option<Subtask>, CoreError>;
    async fn find_subtasks_by_short_id_prefix(
        &self,
        short_id: &str,
    ) -> Result<Vec<Subtask>, CoreError>;
}

/// Answers whether a user is unavailable on a given date.
///
/// Consulted by the reconciliation engine to skip occurrence creation; the
/// engine only ever reads through this interface.
#[async_trait]
pub trait AbsenceOracle {
    async fn is_absent(&self, user_id: Uuid, date: NaiveDate) -> Result<bool, CoreError>;
}

/// Absence bookkeeping on top of the oracle.
#[async_trait]
pub trait AbsenceRepository: AbsenceOracle {
    async fn record_absence(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        kind: AbsenceKind,
        note: Option<String>,
    ) -> Result<UserAbsence, CoreError>;
    async fn remove_absence(&self, id: Uuid) -> Result<(), CoreError>;
    async fn absences_for_user(&self, user_id: Uuid) -> Result<Vec<UserAbsence>, CoreError>;
}

/// Read-side listing for the mobile views.
#[async_trait]
pub trait TaskQueries {
    async fn tasks_for_day(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TaskDetail>, CoreError>;
    async fn tasks_for_today(&self, user_id: Uuid) -> Result<Vec<TaskDetail>, CoreError>;
    /// Tasks scheduled from today through today + `days`, inclusive.
    async fn planned_tasks(&self, user_id: Uuid, days: i64) -> Result<Vec<TaskDetail>, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    TaskRepository + SubtaskRepository + AbsenceRepository + TaskQueries
{
    // This trait automatically composes all domain-specific repositories
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
    attachments: Arc<dyn AttachmentStore>,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self {
            pool,
            clock,
            attachments,
        }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub(crate) fn attachments(&self) -> &dyn AttachmentStore {
        self.attachments.as_ref()
    }

    /// Deletes stored files after a transaction commit. Best-effort: a
    /// failing delete is logged and skipped, never surfaced.
    pub(crate) async fn cleanup_attachments(&self, paths: Vec<String>) {
        for path in paths {
            if let Err(e) = self.attachments.delete(&path).await {
                tracing::warn!(path = %path, error = %e, "attachment cleanup failed");
            }
        }
    }
}

impl Repository for SqliteRepository {}
