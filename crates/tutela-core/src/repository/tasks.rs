//! The recurrence reconciliation engine.
//!
//! Creation expands a weekly pattern into concrete dated occurrences,
//! skipping days the user is absent. A series edit recomputes the desired
//! occurrence set, diffs it against the persisted future occurrences and
//! converges them: obsolete rows are deleted, missing dates are created by
//! replicating the edited base task. Occurrences dated before the cutoff
//! (today, or the new start date when the range moved) are history and are
//! never touched.
//!
//! Every multi-row mutation runs in one transaction. Attachment files are
//! written before commit and deleted best-effort after commit, so a failure
//! can only orphan a file, never dangle a database reference.

use crate::error::CoreError;
use crate::models::{
    NewTaskData, Subtask, Task, TaskDetail, TaskStatus, UpdateOutcome, UpdateTaskData,
};
use crate::repository::SqliteRepository;
use crate::schedule::{default_horizon, occurrence_dates, WeekdaySet};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn create_task(&self, user_id: Uuid, data: NewTaskData) -> Result<TaskDetail, CoreError> {
        if !data.subtasks.iter().any(|s| !s.title.trim().is_empty()) {
            return Err(CoreError::InvalidInput(
                "a task needs at least one subtask with a title".to_string(),
            ));
        }
        if let Some(date) = data.scheduled_date {
            if super::AbsenceOracle::is_absent(self, user_id, date).await? {
                return Err(CoreError::InvalidInput(format!(
                    "user is absent on {date}"
                )));
            }
        }

        // Uploads land on disk before the transaction; a failed insert
        // orphans files at worst.
        let pictogram = match &data.pictogram {
            Some(upload) => Some(self.attachments().store(upload).await?),
            None => None,
        };

        let now = Utc::now();
        let base = Task {
            id: Uuid::now_v7(),
            user_id,
            assigned_by: data.assigned_by,
            title: data.title.clone(),
            description: data.description.clone(),
            color: data.color.clone(),
            scheduled_date: data.scheduled_date,
            scheduled_time: data.scheduled_time,
            estimated_minutes: data.estimated_minutes,
            pictogram,
            position: data.position.unwrap_or(0),
            status: data.status.unwrap_or(TaskStatus::Pending),
            recurrent_task_id: None,
            notifications_enabled: data.notifications_enabled,
            reminder_minutes: data.reminder_minutes,
            created_at: now,
            updated_at: now,
        };

        let mut subtask_rows = Vec::with_capacity(data.subtasks.len());
        for input in &data.subtasks {
            if input.title.trim().is_empty() {
                continue;
            }
            let pictogram = match &input.pictogram {
                Some(upload) => Some(self.attachments().store(upload).await?),
                None => None,
            };
            subtask_rows.push(Subtask {
                id: Uuid::now_v7(),
                task_id: base.id,
                external_id: input.external_id.unwrap_or_else(Uuid::new_v4),
                title: input.title.clone(),
                description: input.description.clone(),
                note: input.note.clone(),
                position: input.position.unwrap_or(subtask_rows.len() as i64),
                status: input.status.unwrap_or(TaskStatus::Pending),
                pictogram,
                created_at: now,
                updated_at: now,
            });
        }

        let mut tx = self.pool().begin().await?;

        Self::insert_task_in_transaction(&mut tx, &base).await?;
        for row in &subtask_rows {
            Self::insert_subtask_in_transaction(&mut tx, row).await?;
        }

        if data.is_recurrent {
            let days = WeekdaySet::from_names(&data.days_of_week);
            let start = data
                .recurrent_start_date
                .or(data.scheduled_date)
                .unwrap_or_else(|| self.today());
            let horizon = data.recurrent_end_date.unwrap_or_else(|| default_horizon(start));

            let family_id = Uuid::now_v7();
            sqlx::query(
                r#"INSERT INTO recurrent_tasks (id, user_id, start_date, end_date, days_of_week, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            )
            .bind(family_id)
            .bind(user_id)
            .bind(start)
            .bind(data.recurrent_end_date)
            .bind(days.to_stored())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE tasks SET recurrent_task_id = $1 WHERE id = $2")
                .bind(family_id)
                .bind(base.id)
                .execute(&mut *tx)
                .await?;

            let mut created = 0usize;
            for date in occurrence_dates(&days, start, horizon) {
                if Some(date) == base.scheduled_date {
                    continue;
                }
                if Self::is_absent_in_transaction(&mut tx, user_id, date).await? {
                    continue;
                }
                Self::replicate_for_date(&mut tx, &base, family_id, date, &subtask_rows).await?;
                created += 1;
            }
            tracing::debug!(family = %family_id, created, "expanded recurring task family");
        }

        tx.commit().await?;

        self.find_task_detail(base.id)
            .await?
            .ok_or_else(|| CoreError::NotFound(base.id.to_string()))
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        data: UpdateTaskData,
        edit_series: bool,
    ) -> Result<UpdateOutcome, CoreError> {
        let mut tx = self.pool().begin().await?;

        let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(task_id.to_string()))?;

        // Stale file paths collected during the transaction, removed from
        // the store only after a successful commit.
        let mut orphaned: Vec<String> = Vec::new();

        if let Some(inputs) = &data.subtasks {
            let removed =
                Self::sync_subtasks(&mut tx, self.attachments(), &task, inputs).await?;
            orphaned.extend(removed);
        }

        self.apply_task_patch(&mut tx, &task, &data, edit_series, &mut orphaned)
            .await?;

        let reconciled = match (edit_series, task.recurrent_task_id) {
            (true, Some(family_id)) => Some(
                self.reconcile_series(&mut tx, &task, family_id, &data, &mut orphaned)
                    .await?,
            ),
            _ => None,
        };

        tx.commit().await?;
        self.cleanup_attachments(orphaned).await;

        match reconciled {
            Some((family_id, cutoff)) => {
                let occurrences: Vec<Task> = sqlx::query_as(
                    r#"SELECT * FROM tasks
                    WHERE recurrent_task_id = $1 AND scheduled_date >= $2
                    ORDER BY scheduled_date, position"#,
                )
                .bind(family_id)
                .bind(cutoff)
                .fetch_all(self.pool())
                .await?;
                Ok(UpdateOutcome::Series(self.load_details(occurrences).await?))
            }
            None => {
                let detail = self
                    .find_task_detail(task_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound(task_id.to_string()))?;
                Ok(UpdateOutcome::Single(detail))
            }
        }
    }

    async fn delete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        delete_series: bool,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(task_id.to_string()))?;

        if task.user_id != user_id {
            return Err(CoreError::PermissionDenied(
                "task belongs to another user".to_string(),
            ));
        }

        let mut orphaned: Vec<String> = Vec::new();

        match (delete_series, task.recurrent_task_id) {
            (true, Some(family_id)) => {
                // Past occurrences are history and survive a series delete.
                let today = self.today();
                let victims: Vec<Task> = sqlx::query_as(
                    "SELECT * FROM tasks WHERE recurrent_task_id = $1 AND scheduled_date >= $2",
                )
                .bind(family_id)
                .bind(today)
                .fetch_all(&mut *tx)
                .await?;

                let count = victims.len();
                for victim in &victims {
                    Self::delete_task_rows(&mut tx, victim, &mut orphaned).await?;
                }
                tracing::info!(family = %family_id, deleted = count, "deleted future occurrences of family");
            }
            _ => {
                Self::delete_task_rows(&mut tx, &task, &mut orphaned).await?;
            }
        }

        tx.commit().await?;
        self.cleanup_attachments(orphaned).await;
        Ok(())
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError> {
        let task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    async fn find_task_detail(&self, id: Uuid) -> Result<Option<TaskDetail>, CoreError> {
        let Some(task) = self.find_task_by_id(id).await? else {
            return Ok(None);
        };
        let mut details = self.load_details(vec![task]).await?;
        Ok(details.pop())
    }

    async fn find_tasks_by_short_id_prefix(&self, short_id: &str) -> Result<Vec<Task>, CoreError> {
        // Ids are stored as 16-byte blobs; match on the hex expansion so a
        // dash-free prefix of the printed uuid resolves.
        let mut pattern = short_id.replace('-', "").to_lowercase();
        pattern.push('%');

        let tasks: Vec<Task> = sqlx::query_as("SELECT * FROM tasks WHERE lower(hex(id)) LIKE ?")
            .bind(pattern)
            .fetch_all(self.pool())
            .await?;
        Ok(tasks)
    }
}

impl SqliteRepository {
    /// Applies the field-fallback patch to one task row. Fields absent from
    /// the payload keep their persisted values; `scheduled_date` is only
    /// writable outside series edits so an instance date never leaks into
    /// the whole family.
    async fn apply_task_patch<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        task: &Task,
        data: &UpdateTaskData,
        edit_series: bool,
        orphaned: &mut Vec<String>,
    ) -> Result<(), CoreError> {
        let new_pictogram = match &data.pictogram {
            Some(upload) => {
                let path = self.attachments().store(upload).await?;
                if let Some(old) = &task.pictogram {
                    orphaned.push(old.clone());
                }
                Some(path)
            }
            None => None,
        };

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET ");
        let mut updated = false;

        if let Some(title) = &data.title {
            qb.push("title = ");
            qb.push_bind(title);
            updated = true;
        }

        if let Some(description) = &data.description {
            if updated {
                qb.push(", ");
            }
            qb.push("description = ");
            qb.push_bind(description);
            updated = true;
        }

        if let Some(color) = &data.color {
            if updated {
                qb.push(", ");
            }
            qb.push("color = ");
            qb.push_bind(color);
            updated = true;
        }

        if !edit_series {
            if let Some(scheduled_date) = data.scheduled_date {
                if updated {
                    qb.push(", ");
                }
                qb.push("scheduled_date = ");
                qb.push_bind(scheduled_date);
                updated = true;
            }
        }

        if let Some(scheduled_time) = &data.scheduled_time {
            if updated {
                qb.push(", ");
            }
            qb.push("scheduled_time = ");
            qb.push_bind(scheduled_time);
            updated = true;
        }

        if let Some(estimated_minutes) = &data.estimated_minutes {
            if updated {
                qb.push(", ");
            }
            qb.push("estimated_minutes = ");
            qb.push_bind(estimated_minutes);
            updated = true;
        }

        if let Some(path) = &new_pictogram {
            if updated {
                qb.push(", ");
            }
            qb.push("pictogram = ");
            qb.push_bind(path);
            updated = true;
        }

        if let Some(position) = data.position {
            if updated {
                qb.push(", ");
            }
            qb.push("position = ");
            qb.push_bind(position);
            updated = true;
        }

        if let Some(status) = &data.status {
            if updated {
                qb.push(", ");
            }
            qb.push("status = ");
            qb.push_bind(status);
            updated = true;
        }

        if let Some(notifications_enabled) = data.notifications_enabled {
            if updated {
                qb.push(", ");
            }
            qb.push("notifications_enabled = ");
            qb.push_bind(notifications_enabled);
            updated = true;
        }

        if let Some(reminder_minutes) = &data.reminder_minutes {
            if updated {
                qb.push(", ");
            }
            qb.push("reminder_minutes = ");
            qb.push_bind(reminder_minutes);
            updated = true;
        }

        if updated {
            qb.push(", updated_at = ");
            qb.push_bind(Utc::now());
            qb.push(" WHERE id = ");
            qb.push_bind(task.id);
            qb.build().execute(&mut **tx).await?;
        }

        Ok(())
    }

    /// Converges the family's persisted future occurrences with its edited
    /// definition. Returns the family id and the cutoff date so the caller
    /// can report the reconciled window.
    async fn reconcile_series<'a>(
        &self,
        tx: &mut Transaction<'a, Sqlite>,
        base: &Task,
        family_id: Uuid,
        data: &UpdateTaskData,
        orphaned: &mut Vec<String>,
    ) -> Result<(Uuid, NaiveDate), CoreError> {
        let family: crate::models::RecurrentTask =
            sqlx::query_as("SELECT * FROM recurrent_tasks WHERE id = $1")
                .bind(family_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| CoreError::NotFound(family_id.to_string()))?;

        let prior_start = family.start_date;
        let prior_end = family.end_date;

        let new_start = data.recurrent_start_date.unwrap_or(prior_start);
        let new_end = data.recurrent_end_date.or(prior_end);
        let days = match &data.days_of_week {
            Some(names) => WeekdaySet::from_names(names),
            None => WeekdaySet::from_stored(&family.days_of_week),
        };

        sqlx::query(
            r#"UPDATE recurrent_tasks
            SET start_date = $1, end_date = $2, days_of_week = $3, updated_at = $4
            WHERE id = $5"#,
        )
        .bind(new_start)
        .bind(new_end)
        .bind(days.to_stored())
        .bind(Utc::now())
        .bind(family_id)
        .execute(&mut **tx)
        .await?;

        // A range only counts as moved when the family was fully bounded
        // before the edit; an open-ended family keeps the plain cutoff.
        let range_changed =
            prior_end.is_some() && (new_start != prior_start || new_end != prior_end);
        let today = self.today();
        let cutoff = if range_changed {
            today.max(new_start)
        } else {
            today
        };

        let horizon = new_end.unwrap_or_else(|| default_horizon(new_start));
        let desired_future: HashSet<NaiveDate> = occurrence_dates(&days, new_start, horizon)
            .into_iter()
            .filter(|d| *d >= cutoff)
            .collect();

        // The base row being edited stays out of the diff, like a template:
        // it was just patched and its subtasks seed the replicas.
        let existing: Vec<Task> = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE recurrent_task_id = $1 AND scheduled_date >= $2 AND id != $3"#,
        )
        .bind(family_id)
        .bind(cutoff)
        .bind(base.id)
        .fetch_all(&mut **tx)
        .await?;

        let existing_dates: HashSet<NaiveDate> =
            existing.iter().filter_map(|t| t.scheduled_date).collect();

        let mut deleted = 0usize;
        for stale in &existing {
            let keep = stale
                .scheduled_date
                .map_or(false, |d| desired_future.contains(&d));
            if !keep {
                Self::delete_task_rows(tx, stale, orphaned).await?;
                deleted += 1;
            }
        }

        // Replicas copy the base task as it stands after the patch.
        let current: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(base.id)
            .fetch_one(&mut **tx)
            .await?;
        let template_subtasks = Self::subtasks_for_task_in_transaction(tx, base.id).await?;

        let mut missing: Vec<NaiveDate> = desired_future
            .difference(&existing_dates)
            .copied()
            .collect();
        missing.sort_unstable();

        let mut created = 0usize;
        for date in missing {
            if Some(date) == current.scheduled_date {
                continue;
            }
            if Self::is_absent_in_transaction(tx, current.user_id, date).await? {
                continue;
            }
            Self::replicate_for_date(tx, &current, family_id, date, &template_subtasks).await?;
            created += 1;
        }

        tracing::info!(
            family = %family_id,
            cutoff = %cutoff,
            created,
            deleted,
            "reconciled recurring task family"
        );

        Ok((family_id, cutoff))
    }

    /// Inserts one occurrence of `template` on `date`, copying its subtasks
    /// with fresh ids. Replicas share the template's pictogram paths.
    pub(crate) async fn replicate_for_date<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        template: &Task,
        family_id: Uuid,
        date: NaiveDate,
        subtasks: &[Subtask],
    ) -> Result<Task, CoreError> {
        let now = Utc::now();
        let occurrence = Task {
            id: Uuid::now_v7(),
            scheduled_date: Some(date),
            recurrent_task_id: Some(family_id),
            created_at: now,
            updated_at: now,
            ..template.clone()
        };
        Self::insert_task_in_transaction(tx, &occurrence).await?;

        for sub in subtasks {
            let copy = Subtask {
                id: Uuid::now_v7(),
                task_id: occurrence.id,
                external_id: Uuid::new_v4(),
                created_at: now,
                updated_at: now,
                ..sub.clone()
            };
            Self::insert_subtask_in_transaction(tx, &copy).await?;
        }

        Ok(occurrence)
    }

    /// Deletes one task row with its subtasks, queueing attachment paths
    /// for post-commit cleanup.
    pub(crate) async fn delete_task_rows<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task: &Task,
        orphaned: &mut Vec<String>,
    ) -> Result<(), CoreError> {
        if let Some(path) = &task.pictogram {
            orphaned.push(path.clone());
        }

        let subtask_paths: Vec<String> = sqlx::query_scalar(
            "SELECT pictogram FROM subtasks WHERE task_id = $1 AND pictogram IS NOT NULL",
        )
        .bind(task.id)
        .fetch_all(&mut **tx)
        .await?;
        orphaned.extend(subtask_paths);

        sqlx::query("DELETE FROM subtasks WHERE task_id = $1")
            .bind(task.id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task.id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn insert_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task: &Task,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO tasks (id, user_id, assigned_by, title, description, color, scheduled_date, scheduled_time, estimated_minutes, pictogram, position, status, recurrent_task_id, notifications_enabled, reminder_minutes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(task.assigned_by)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.color)
        .bind(task.scheduled_date)
        .bind(task.scheduled_time)
        .bind(task.estimated_minutes)
        .bind(&task.pictogram)
        .bind(task.position)
        .bind(task.status)
        .bind(task.recurrent_task_id)
        .bind(task.notifications_enabled)
        .bind(task.reminder_minutes)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub(crate) async fn insert_subtask_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        sub: &Subtask,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO subtasks (id, task_id, external_id, title, description, note, position, status, pictogram, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(sub.id)
        .bind(sub.task_id)
        .bind(sub.external_id)
        .bind(&sub.title)
        .bind(&sub.description)
        .bind(&sub.note)
        .bind(sub.position)
        .bind(sub.status)
        .bind(&sub.pictogram)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub(crate) async fn subtasks_for_task_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        task_id: Uuid,
    ) -> Result<Vec<Subtask>, CoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM subtasks WHERE task_id = $1 ORDER BY position, created_at",
        )
        .bind(task_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows)
    }
}
