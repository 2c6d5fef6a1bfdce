use anyhow::Result;
use tutela_core::repository::Repository;
use uuid::Uuid;

use crate::cli::ListCommand;
use crate::config::Config;
use crate::parser::parse_date;
use crate::views::table::display_task_details;

pub async fn list_tasks(
    repo: &impl Repository,
    user: Uuid,
    command: ListCommand,
    config: &Config,
) -> Result<()> {
    let details = if command.planned {
        let days = command.days.unwrap_or(config.planned_days);
        repo.planned_tasks(user, days).await?
    } else if let Some(raw) = &command.date {
        repo.tasks_for_day(user, parse_date(raw)?).await?
    } else {
        repo.tasks_for_today(user).await?
    };

    display_task_details(&details);
    Ok(())
}
