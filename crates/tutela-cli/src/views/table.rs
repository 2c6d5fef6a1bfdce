use comfy_table::{Attribute, Cell, Color, Row, Table};
use tutela_core::models::{AbsenceKind, TaskDetail, TaskStatus, UserAbsence};

pub fn display_task_details(details: &[TaskDetail]) {
    if details.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Title", "Date", "Time", "Status", "Subtasks", "Recurring",
    ]);

    for detail in details {
        let task = &detail.task;
        let mut row = Row::new();
        row.add_cell(Cell::new(&task.id.to_string()[..7]));

        let mut title_cell = Cell::new(&task.title);
        if task.status == TaskStatus::Completed {
            title_cell = title_cell
                .fg(Color::Green)
                .add_attribute(Attribute::CrossedOut);
        }
        row.add_cell(title_cell);

        row.add_cell(Cell::new(
            task.scheduled_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));
        row.add_cell(Cell::new(
            task.scheduled_time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));

        let status_cell = match task.status {
            TaskStatus::Pending => Cell::new("pending").fg(Color::Yellow),
            TaskStatus::Completed => Cell::new("completed").fg(Color::Green),
        };
        row.add_cell(status_cell);

        let done = detail
            .subtasks
            .iter()
            .filter(|s| s.status == TaskStatus::Completed)
            .count();
        row.add_cell(Cell::new(format!("{done}/{}", detail.subtasks.len())));

        row.add_cell(Cell::new(if detail.recurrence.is_some() {
            "↻"
        } else {
            ""
        }));

        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_subtasks(detail: &TaskDetail) {
    if detail.subtasks.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Subtask", "Status"]);
    for sub in &detail.subtasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(&sub.id.to_string()[..7]));
        row.add_cell(Cell::new(&sub.title));
        row.add_cell(match sub.status {
            TaskStatus::Pending => Cell::new("pending").fg(Color::Yellow),
            TaskStatus::Completed => Cell::new("completed").fg(Color::Green),
        });
        table.add_row(row);
    }
    println!("{table}");
}

pub fn display_absences(absences: &[UserAbsence]) {
    if absences.is_empty() {
        println!("No absences recorded.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Kind", "Note"]);
    for absence in absences {
        let mut row = Row::new();
        row.add_cell(Cell::new(&absence.id.to_string()[..7]));
        row.add_cell(Cell::new(absence.date.format("%Y-%m-%d").to_string()));
        row.add_cell(Cell::new(match absence.kind {
            AbsenceKind::Vacation => "vacation",
            AbsenceKind::LegalAbsence => "legal absence",
        }));
        row.add_cell(Cell::new(absence.note.as_deref().unwrap_or("-")));
        table.add_row(row);
    }
    println!("{table}");
}
