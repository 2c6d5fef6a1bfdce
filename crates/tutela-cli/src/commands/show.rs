use anyhow::{anyhow, Result};
use tutela_core::error::CoreError;
use tutela_core::repository::Repository;
use tutela_core::schedule::WeekdaySet;

use crate::cli::ShowCommand;
use crate::util::resolve_task_id;
use crate::views::table::{display_subtasks, display_task_details};

pub async fn show_task(repo: &impl Repository, command: ShowCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, &command.id).await?;
    let detail = repo
        .find_task_detail(task_id)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(task_id.to_string())))?;

    display_task_details(std::slice::from_ref(&detail));
    display_subtasks(&detail);

    if let Some(recurrence) = &detail.recurrence {
        let until = recurrence
            .end_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "open-ended".to_string());
        println!(
            "Repeats on {} from {} until {}",
            WeekdaySet::from_stored(&recurrence.days_of_week).names().join(", "),
            recurrence.start_date.format("%Y-%m-%d"),
            until
        );
    }

    Ok(())
}
