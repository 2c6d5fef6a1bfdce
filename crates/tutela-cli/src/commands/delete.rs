use anyhow::Result;
use tutela_core::repository::Repository;
use uuid::Uuid;

use crate::cli::DeleteCommand;

pub async fn delete_task(
    repo: &impl Repository,
    user: Uuid,
    task_id: Uuid,
    command: &DeleteCommand,
) -> Result<()> {
    repo.delete_task(user, task_id, command.series).await?;
    if command.series {
        println!("Deleted the series' future occurrences.");
    } else {
        println!("Deleted task.");
    }
    Ok(())
}
