use anyhow::Result;
use owo_colors::OwoColorize;
use tutela_core::models::TaskStatus;
use tutela_core::repository::Repository;
use uuid::Uuid;

use crate::cli::CheckCommand;
use crate::util::resolve_subtask_id;

pub async fn set_subtask_status(
    repo: &impl Repository,
    user: Uuid,
    command: CheckCommand,
    status: TaskStatus,
) -> Result<()> {
    let subtask_id = resolve_subtask_id(repo, &command.id).await?;
    let subtask = repo.update_subtask_status(subtask_id, status, user).await?;

    match status {
        TaskStatus::Completed => {
            println!("{} Checked '{}'", "✓".green().bold(), subtask.title);
        }
        TaskStatus::Pending => {
            println!("{} Reopened '{}'", "↺".yellow().bold(), subtask.title);
        }
    }

    // show whether the parent followed
    if let Some(task) = repo.find_task_by_id(subtask.task_id).await? {
        if task.status == TaskStatus::Completed {
            println!("  Task '{}' is now completed.", task.title.bold());
        }
    }

    Ok(())
}
