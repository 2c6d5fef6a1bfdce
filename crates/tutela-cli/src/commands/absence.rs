use anyhow::Result;
use owo_colors::OwoColorize;
use tutela_core::models::AbsenceKind;
use tutela_core::repository::Repository;
use uuid::Uuid;

use crate::cli::{AbsenceAction, AbsenceCommand, AbsenceKindArg};
use crate::parser::parse_date;
use crate::views::table::display_absences;

pub async fn absence_command(
    repo: &impl Repository,
    user: Uuid,
    command: AbsenceCommand,
) -> Result<()> {
    match command.action {
        AbsenceAction::Add { date, kind, note } => {
            let kind = match kind {
                AbsenceKindArg::Vacation => AbsenceKind::Vacation,
                AbsenceKindArg::LegalAbsence => AbsenceKind::LegalAbsence,
            };
            let absence = repo
                .record_absence(user, parse_date(&date)?, kind, note)
                .await?;
            println!(
                "{} Recorded absence on {}",
                "✓".green().bold(),
                absence.date.format("%Y-%m-%d")
            );
        }
        AbsenceAction::Remove { id } => {
            repo.remove_absence(id).await?;
            println!("Removed absence.");
        }
        AbsenceAction::List => {
            let absences = repo.absences_for_user(user).await?;
            display_absences(&absences);
        }
    }
    Ok(())
}
