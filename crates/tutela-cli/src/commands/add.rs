use anyhow::{anyhow, Result};
use owo_colors::{OwoColorize, Style};
use tutela_core::models::{NewAttachment, NewTaskData, SubtaskInput};
use tutela_core::repository::Repository;
use uuid::Uuid;

use crate::cli::AddCommand;
use crate::parser::{parse_date, parse_days, parse_time};

pub async fn add_task(repo: &impl Repository, user: Uuid, command: AddCommand) -> Result<()> {
    let scheduled_date = command.date.as_deref().map(parse_date).transpose()?;
    let scheduled_time = command.time.as_deref().map(parse_time).transpose()?;
    let recurrent_start_date = command.from.as_deref().map(parse_date).transpose()?;
    let recurrent_end_date = command.until.as_deref().map(parse_date).transpose()?;

    let pictogram = match &command.pictogram {
        Some(path) => Some(read_attachment(path).await?),
        None => None,
    };

    let days_of_week = match &command.on {
        Some(raw) => parse_days(raw),
        None => Vec::new(),
    };
    if command.recurrent && days_of_week.is_empty() {
        return Err(anyhow!(
            "A recurring task needs --on with at least one weekday"
        ));
    }

    let subtasks: Vec<SubtaskInput> = command
        .subtasks
        .iter()
        .map(|title| SubtaskInput {
            title: title.clone(),
            ..Default::default()
        })
        .collect();

    let data = NewTaskData {
        title: command.title,
        description: command.description,
        color: command.color,
        scheduled_date,
        scheduled_time,
        estimated_minutes: command.duration,
        pictogram,
        notifications_enabled: command.notify,
        reminder_minutes: command.remind,
        subtasks,
        is_recurrent: command.recurrent,
        days_of_week,
        recurrent_start_date,
        recurrent_end_date,
        ..Default::default()
    };

    let detail = repo.create_task(user, data).await?;

    let success_style = Style::new().green().bold();
    if detail.recurrence.is_some() {
        println!(
            "{} Created recurring task: {}",
            "✓".style(success_style),
            detail.task.title.bold()
        );
    } else {
        println!(
            "{} Created task: {}",
            "✓".style(success_style),
            detail.task.title.bold()
        );
    }
    println!("  Task ID: {}", detail.task.id.to_string().yellow());
    for sub in &detail.subtasks {
        println!("  Subtask {}: {}", sub.id.to_string().yellow(), sub.title);
    }

    Ok(())
}

async fn read_attachment(path: &str) -> Result<NewAttachment> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow!("Cannot read pictogram '{path}': {e}"))?;
    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pictogram".to_string());
    Ok(NewAttachment { file_name, bytes })
}
