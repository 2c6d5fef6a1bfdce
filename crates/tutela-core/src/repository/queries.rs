//! Read-side listing for the daily and planning views.

use crate::error::CoreError;
use crate::models::{RecurrentTask, Subtask, Task, TaskDetail};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

#[async_trait]
impl super::TaskQueries for SqliteRepository {
    async fn tasks_for_day(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TaskDetail>, CoreError> {
        let tasks: Vec<Task> = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE user_id = $1 AND scheduled_date = $2
            ORDER BY position, scheduled_time"#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;
        self.load_details(tasks).await
    }

    async fn tasks_for_today(&self, user_id: Uuid) -> Result<Vec<TaskDetail>, CoreError> {
        self.tasks_for_day(user_id, self.today()).await
    }

    async fn planned_tasks(&self, user_id: Uuid, days: i64) -> Result<Vec<TaskDetail>, CoreError> {
        let today = self.today();
        let until = today + Duration::days(days);
        let tasks: Vec<Task> = sqlx::query_as(
            r#"SELECT * FROM tasks
            WHERE user_id = $1 AND scheduled_date >= $2 AND scheduled_date <= $3
            ORDER BY scheduled_date, position, scheduled_time"#,
        )
        .bind(user_id)
        .bind(today)
        .bind(until)
        .fetch_all(self.pool())
        .await?;
        self.load_details(tasks).await
    }
}

impl SqliteRepository {
    /// Eager-loads ordered subtasks and the recurrence definition for each
    /// task.
    pub(crate) async fn load_details(
        &self,
        tasks: Vec<Task>,
    ) -> Result<Vec<TaskDetail>, CoreError> {
        let mut details = Vec::with_capacity(tasks.len());
        for task in tasks {
            let subtasks: Vec<Subtask> = sqlx::query_as(
                "SELECT * FROM subtasks WHERE task_id = $1 ORDER BY position, created_at",
            )
            .bind(task.id)
            .fetch_all(self.pool())
            .await?;

            let recurrence: Option<RecurrentTask> = match task.recurrent_task_id {
                Some(family_id) => {
                    sqlx::query_as("SELECT * FROM recurrent_tasks WHERE id = $1")
                        .bind(family_id)
                        .fetch_optional(self.pool())
                        .await?
                }
                None => None,
            };

            details.push(TaskDetail {
                task,
                subtasks,
                recurrence,
            });
        }
        Ok(details)
    }
}
