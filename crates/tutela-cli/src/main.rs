use anyhow::{anyhow, Result};
use clap::Parser;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tutela_core::attachments::FsAttachmentStore;
use tutela_core::clock::SystemClock;
use tutela_core::db;
use tutela_core::error::CoreError;
use tutela_core::models::TaskStatus;
use tutela_core::repository::{Repository, SqliteRepository};
use util::resolve_task_id;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::new().unwrap_or_default();

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let repository = SqliteRepository::new(
        db_pool,
        Arc::new(SystemClock),
        Arc::new(FsAttachmentStore::new(&config.attachments_dir)),
    );

    let cli = cli::Cli::parse();

    if let Err(e) = run(&repository, &config, cli).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(repository: &impl Repository, config: &config::Config, cli: cli::Cli) -> Result<()> {
    let acting_user = cli.user.or(config.default_user);

    match cli.command {
        cli::Commands::Add(command) => {
            commands::add::add_task(repository, require_user(acting_user)?, command).await
        }
        cli::Commands::List(command) => {
            commands::list::list_tasks(repository, require_user(acting_user)?, command, config)
                .await
        }
        cli::Commands::Show(command) => commands::show::show_task(repository, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_task(repository, command).await,
        cli::Commands::Delete(command) => {
            let task_id = resolve_task_id(repository, &command.id).await?;
            let task = repository
                .find_task_by_id(task_id)
                .await?
                .ok_or_else(|| anyhow!(CoreError::NotFound(task_id.to_string())))?;

            if !command.force {
                let prompt = if command.series {
                    format!(
                        "Delete '{}' and every future occurrence of its series?",
                        task.title
                    )
                } else {
                    format!("Delete task '{}'?", task.title)
                };
                let confirmation = Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirmation {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            commands::delete::delete_task(
                repository,
                require_user(acting_user)?,
                task_id,
                &command,
            )
            .await
        }
        cli::Commands::Check(command) => {
            commands::check::set_subtask_status(
                repository,
                require_user(acting_user)?,
                command,
                TaskStatus::Completed,
            )
            .await
        }
        cli::Commands::Uncheck(command) => {
            commands::check::set_subtask_status(
                repository,
                require_user(acting_user)?,
                command,
                TaskStatus::Pending,
            )
            .await
        }
        cli::Commands::Absence(command) => {
            commands::absence::absence_command(repository, require_user(acting_user)?, command)
                .await
        }
    }
}

fn require_user(user: Option<Uuid>) -> Result<Uuid> {
    user.ok_or_else(|| {
        anyhow!(CoreError::InvalidInput(
            "No acting user. Pass --user or set default_user in tutela.toml.".to_string()
        ))
    })
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();
    let core_error = err
        .downcast_ref::<CoreError>()
        .or_else(|| err.source().and_then(|e| e.downcast_ref::<CoreError>()));

    if let Some(core_error) = core_error {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::PermissionDenied(s) => {
                eprintln!("{} Permission denied: {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(rows) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in rows {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
