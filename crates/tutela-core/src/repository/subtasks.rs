//! Subtask synchronization and completion propagation.
//!
//! Synchronization reconciles a submitted subtask array against the
//! persisted rows of one task, matched by external identifier. It runs
//! inside the caller's transaction during a task edit. Completion
//! propagation is the independent status workflow driven by the mobile
//! side: checking the last open subtask completes the parent, reopening
//! any subtask reopens it.

use crate::attachments::AttachmentStore;
use crate::error::CoreError;
use crate::models::{Subtask, SubtaskInput, Task, TaskStatus};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::SubtaskRepository for SqliteRepository {
    async fn update_subtask_status(
        &self,
        subtask_id: Uuid,
        status: TaskStatus,
        acting_user: Uuid,
    ) -> Result<Subtask, CoreError> {
        let mut tx = self.pool().begin().await?;

        let subtask: Subtask = sqlx::query_as("SELECT * FROM subtasks WHERE id = $1")
            .bind(subtask_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(subtask_id.to_string()))?;

        let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(subtask.task_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(subtask.task_id.to_string()))?;

        if task.user_id != acting_user {
            return Err(CoreError::PermissionDenied(
                "subtask belongs to another user's task".to_string(),
            ));
        }

        let updated: Subtask = sqlx::query_as(
            r#"UPDATE subtasks
            SET status = $1, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(subtask_id)
        .fetch_one(&mut *tx)
        .await?;

        match status {
            TaskStatus::Completed => {
                // The updated row is already persisted, so the parent is
                // complete exactly when no sibling remains open.
                let open_sibling: Option<i32> = sqlx::query_scalar(
                    r#"SELECT 1 FROM subtasks
                    WHERE task_id = $1 AND id != $2 AND status != 'completed'
                    LIMIT 1"#,
                )
                .bind(task.id)
                .bind(subtask_id)
                .fetch_optional(&mut *tx)
                .await?;

                if open_sibling.is_none() {
                    sqlx::query("UPDATE tasks SET status = $1, updated_at = $2 WHERE id = $3")
                        .bind(TaskStatus::Completed)
                        .bind(Utc::now())
                        .bind(task.id)
                        .execute(&mut *tx)
                        .await?;
                    tracing::debug!(task = %task.id, "all subtasks completed, task completed");
                }
            }
            TaskStatus::Pending => {
                if task.status == TaskStatus::Completed {
                    sqlx::query("UPDATE tasks SET status = $1, updated_at = $2 WHERE id = $3")
                        .bind(TaskStatus::Pending)
                        .bind(Utc::now())
                        .bind(task.id)
                        .execute(&mut *tx)
                        .await?;
                    tracing::debug!(task = %task.id, "subtask reopened, task reopened");
                }
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn find_subtask_by_id(&self, id: Uuid) -> Result<Option<Subtask>, CoreError> {
        let subtask = sqlx::query_as("SELECT * FROM subtasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(subtask)
    }

    async fn find_subtasks_by_short_id_prefix(
        &self,
        short_id: &str,
    ) -> Result<Vec<Subtask>, CoreError> {
        let mut pattern = short_id.replace('-', "").to_lowercase();
        pattern.push('%');

        let subtasks: Vec<Subtask> =
            sqlx::query_as("SELECT * FROM subtasks WHERE lower(hex(id)) LIKE ?")
                .bind(pattern)
                .fetch_all(self.pool())
                .await?;
        Ok(subtasks)
    }
}

impl SqliteRepository {
    /// Reconciles the task's persisted subtasks with one submitted array.
    ///
    /// Rows are matched by external identifier; a record without one is new
    /// and gets a fresh identifier. Persisted rows whose identifier is not
    /// in the submission were removed by the user and are deleted. Returns
    /// the attachment paths that became stale, for post-commit cleanup.
    /// Re-submitting the same array is a no-op.
    pub(crate) async fn sync_subtasks<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        store: &dyn AttachmentStore,
        task: &Task,
        inputs: &[SubtaskInput],
    ) -> Result<Vec<String>, CoreError> {
        let mut orphaned: Vec<String> = Vec::new();
        let mut submitted: Vec<Uuid> = Vec::with_capacity(inputs.len());
        let now = Utc::now();

        for (index, input) in inputs.iter().enumerate() {
            let external_id = input.external_id.unwrap_or_else(Uuid::new_v4);
            submitted.push(external_id);

            let existing: Option<Subtask> = sqlx::query_as(
                "SELECT * FROM subtasks WHERE task_id = $1 AND external_id = $2",
            )
            .bind(task.id)
            .bind(external_id)
            .fetch_optional(&mut **tx)
            .await?;

            match existing {
                Some(current) => {
                    let pictogram = match &input.pictogram {
                        Some(upload) => {
                            let path = store.store(upload).await?;
                            if let Some(old) = &current.pictogram {
                                orphaned.push(old.clone());
                            }
                            Some(path)
                        }
                        None => current.pictogram.clone(),
                    };

                    sqlx::query(
                        r#"UPDATE subtasks
                        SET title = $1, description = $2, note = $3, position = $4, status = $5, pictogram = $6, updated_at = $7
                        WHERE id = $8"#,
                    )
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.note)
                    .bind(input.position.unwrap_or(index as i64))
                    .bind(input.status.unwrap_or(current.status))
                    .bind(&pictogram)
                    .bind(now)
                    .bind(current.id)
                    .execute(&mut **tx)
                    .await?;
                }
                None => {
                    let pictogram = match &input.pictogram {
                        Some(upload) => Some(store.store(upload).await?),
                        None => None,
                    };

                    let row = Subtask {
                        id: Uuid::now_v7(),
                        task_id: task.id,
                        external_id,
                        title: input.title.clone(),
                        description: input.description.clone(),
                        note: input.note.clone(),
                        position: input.position.unwrap_or(index as i64),
                        status: input.status.unwrap_or(TaskStatus::Pending),
                        pictogram,
                        created_at: now,
                        updated_at: now,
                    };
                    Self::insert_subtask_in_transaction(tx, &row).await?;
                }
            }
        }

        // Rows the client no longer submits were removed by the user.
        let persisted = Self::subtasks_for_task_in_transaction(tx, task.id).await?;
        for row in persisted {
            if submitted.contains(&row.external_id) {
                continue;
            }
            if let Some(path) = &row.pictogram {
                orphaned.push(path.clone());
            }
            sqlx::query("DELETE FROM subtasks WHERE id = $1")
                .bind(row.id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(orphaned)
    }
}
