use anyhow::Result;
use owo_colors::OwoColorize;
use tutela_core::models::{TaskStatus, UpdateOutcome, UpdateTaskData};
use tutela_core::repository::Repository;

use crate::cli::{EditCommand, StatusArg};
use crate::parser::{parse_date, parse_days, parse_time};
use crate::util::resolve_task_id;

pub async fn edit_task(repo: &impl Repository, command: EditCommand) -> Result<()> {
    let task_id = resolve_task_id(repo, &command.id).await?;

    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.clone().map(Some)
    };
    let color = if command.color_clear {
        Some(None)
    } else {
        command.color.clone().map(Some)
    };
    let scheduled_time = if command.time_clear {
        Some(None)
    } else {
        command
            .time
            .as_deref()
            .map(parse_time)
            .transpose()?
            .map(Some)
    };

    let data = UpdateTaskData {
        title: command.title.clone(),
        description,
        color,
        scheduled_date: command.date.as_deref().map(parse_date).transpose()?,
        scheduled_time,
        estimated_minutes: command.duration.map(Some),
        position: command.position,
        status: command.status.map(|s| match s {
            StatusArg::Pending => TaskStatus::Pending,
            StatusArg::Completed => TaskStatus::Completed,
        }),
        days_of_week: command.on.as_deref().map(parse_days),
        recurrent_start_date: command.from.as_deref().map(parse_date).transpose()?,
        recurrent_end_date: command.until.as_deref().map(parse_date).transpose()?,
        ..Default::default()
    };

    match repo.update_task(task_id, data, command.series).await? {
        UpdateOutcome::Single(detail) => {
            println!("{} Updated task: {}", "✓".green().bold(), detail.task.title);
        }
        UpdateOutcome::Series(details) => {
            println!(
                "{} Updated series: {} future occurrence(s) in place",
                "✓".green().bold(),
                details.len()
            );
        }
    }

    Ok(())
}
