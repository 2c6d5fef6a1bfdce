use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;
use uuid::Uuid;

use tutela_core::attachments::FsAttachmentStore;
use tutela_core::clock::FixedClock;
use tutela_core::db::establish_connection;
use tutela_core::error::CoreError;
use tutela_core::models::{
    AbsenceKind, NewAttachment, NewTaskData, SubtaskInput, TaskDetail, TaskStatus, UpdateOutcome,
    UpdateTaskData,
};
use tutela_core::repository::{
    AbsenceRepository, SqliteRepository, SubtaskRepository, TaskQueries, TaskRepository,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Repositories are pinned to 2025-02-01 so cutoff logic is deterministic.
const TODAY: (i32, u32, u32) = (2025, 2, 1);

async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    let clock = FixedClock(date(TODAY.0, TODAY.1, TODAY.2));
    let attachments = FsAttachmentStore::new(temp_dir.path().join("attachments"));
    let repository = SqliteRepository::new(pool, Arc::new(clock), Arc::new(attachments));

    (repository, temp_dir)
}

fn subtask(title: &str) -> SubtaskInput {
    SubtaskInput {
        title: title.to_string(),
        ..Default::default()
    }
}

fn basic_task(title: &str) -> NewTaskData {
    NewTaskData {
        title: title.to_string(),
        scheduled_date: Some(date(TODAY.0, TODAY.1, TODAY.2)),
        subtasks: vec![subtask("step one")],
        ..Default::default()
    }
}

fn weekly_task(
    title: &str,
    days: &[&str],
    base_date: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
) -> NewTaskData {
    NewTaskData {
        title: title.to_string(),
        scheduled_date: Some(base_date),
        subtasks: vec![subtask("step one"), subtask("step two")],
        is_recurrent: true,
        days_of_week: days.iter().map(|d| d.to_string()).collect(),
        recurrent_start_date: Some(start),
        recurrent_end_date: Some(end),
        ..Default::default()
    }
}

async fn family_dates(repo: &SqliteRepository, user: Uuid, horizon_days: i64) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = repo
        .planned_tasks(user, horizon_days)
        .await
        .expect("planned_tasks failed")
        .into_iter()
        .filter(|d| d.task.recurrent_task_id.is_some())
        .filter_map(|d| d.task.scheduled_date)
        .collect();
    dates.sort();
    dates
}

#[tokio::test]
async fn test_create_requires_a_titled_subtask() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    let mut data = basic_task("Laundry");
    data.subtasks = vec![];
    assert!(matches!(
        repo.create_task(user, data).await,
        Err(CoreError::InvalidInput(_))
    ));

    let mut data = basic_task("Laundry");
    data.subtasks = vec![subtask("   "), subtask("")];
    assert!(matches!(
        repo.create_task(user, data).await,
        Err(CoreError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_create_rejects_scheduling_on_absent_day() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    repo.record_absence(user, date(2025, 2, 1), AbsenceKind::Vacation, None)
        .await
        .unwrap();

    let result = repo.create_task(user, basic_task("Laundry")).await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));

    // nothing was written
    let today = repo.tasks_for_today(user).await.unwrap();
    assert!(today.is_empty());
}

#[tokio::test]
async fn test_recurring_creation_skips_absent_days() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    repo.record_absence(user, date(2025, 2, 5), AbsenceKind::LegalAbsence, None)
        .await
        .unwrap();

    let detail = repo
        .create_task(
            user,
            weekly_task(
                "Water the plants",
                &["wednesday"],
                date(2025, 2, 1),
                date(2025, 2, 1),
                date(2025, 2, 28),
            ),
        )
        .await
        .unwrap();

    assert!(detail.recurrence.is_some());
    assert_eq!(detail.subtasks.len(), 2);

    let dates = family_dates(&repo, user, 27).await;
    // base task on Feb 1 plus every Wednesday except the absent Feb 5
    assert_eq!(
        dates,
        vec![
            date(2025, 2, 1),
            date(2025, 2, 12),
            date(2025, 2, 19),
            date(2025, 2, 26),
        ]
    );
}

#[tokio::test]
async fn test_occurrences_copy_subtasks() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    repo.create_task(
        user,
        weekly_task(
            "Medication",
            &["wednesday"],
            date(2025, 2, 1),
            date(2025, 2, 1),
            date(2025, 2, 28),
        ),
    )
    .await
    .unwrap();

    let occurrences = repo.tasks_for_day(user, date(2025, 2, 12)).await.unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].subtasks.len(), 2);
    assert_eq!(occurrences[0].task.title, "Medication");
}

/// Seeds a family spanning January (history) and February (future):
/// Wednesdays from 2025-01-01 through 2025-02-28, base task on Jan 1.
async fn seed_spanning_family(repo: &SqliteRepository, user: Uuid) -> TaskDetail {
    repo.create_task(
        user,
        weekly_task(
            "Physio exercises",
            &["wednesday"],
            date(2025, 1, 1),
            date(2025, 1, 1),
            date(2025, 2, 28),
        ),
    )
    .await
    .expect("failed to seed family")
}

const JANUARY_WEDNESDAYS: [(i32, u32, u32); 5] = [
    (2025, 1, 1),
    (2025, 1, 8),
    (2025, 1, 15),
    (2025, 1, 22),
    (2025, 1, 29),
];

#[tokio::test]
async fn test_series_edit_never_touches_history_before_cutoff() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();
    let base = seed_spanning_family(&repo, user).await;

    // remember the historical row ids
    let mut history = Vec::new();
    for (y, m, d) in JANUARY_WEDNESDAYS {
        let rows = repo.tasks_for_day(user, date(y, m, d)).await.unwrap();
        assert_eq!(rows.len(), 1);
        history.push(rows[0].task.id);
    }

    // switch the pattern to Fridays; range unchanged, so cutoff = today
    let update = UpdateTaskData {
        days_of_week: Some(vec!["friday".to_string()]),
        ..Default::default()
    };
    let outcome = repo.update_task(base.task.id, update, true).await.unwrap();

    // history is intact, same rows
    for ((y, m, d), id) in JANUARY_WEDNESDAYS.iter().zip(&history) {
        let rows = repo.tasks_for_day(user, date(*y, *m, *d)).await.unwrap();
        assert_eq!(rows.len(), 1, "history row for {y}-{m}-{d} disappeared");
        assert_eq!(rows[0].task.id, *id);
    }

    // future Wednesdays replaced by future Fridays
    for d in [5u32, 12, 19, 26] {
        assert!(repo.tasks_for_day(user, date(2025, 2, d)).await.unwrap().is_empty());
    }
    for d in [6u32, 13, 20, 27] {
        assert_eq!(repo.tasks_for_day(user, date(2025, 2, d)).await.unwrap().len(), 1);
    }

    match outcome {
        UpdateOutcome::Series(details) => {
            let mut dates: Vec<NaiveDate> =
                details.iter().filter_map(|d| d.task.scheduled_date).collect();
            dates.sort();
            assert_eq!(
                dates,
                vec![
                    date(2025, 2, 6),
                    date(2025, 2, 13),
                    date(2025, 2, 20),
                    date(2025, 2, 27),
                ]
            );
        }
        UpdateOutcome::Single(_) => panic!("expected a series outcome"),
    }
}

#[tokio::test]
async fn test_series_edit_is_idempotent() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();
    let base = seed_spanning_family(&repo, user).await;

    let update = UpdateTaskData {
        days_of_week: Some(vec!["friday".to_string()]),
        ..Default::default()
    };
    repo.update_task(base.task.id, update.clone(), true)
        .await
        .unwrap();

    let snapshot = |details: Vec<TaskDetail>| {
        let mut rows: Vec<(Uuid, Option<NaiveDate>)> = details
            .into_iter()
            .map(|d| (d.task.id, d.task.scheduled_date))
            .collect();
        rows.sort();
        rows
    };

    let first = snapshot(repo.planned_tasks(user, 60).await.unwrap());
    repo.update_task(base.task.id, update, true).await.unwrap();
    let second = snapshot(repo.planned_tasks(user, 60).await.unwrap());

    // same rows, same ids: the second pass created and deleted nothing
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_single_edit_does_not_move_other_occurrences() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();
    seed_spanning_family(&repo, user).await;

    let feb5 = repo.tasks_for_day(user, date(2025, 2, 5)).await.unwrap();
    let occurrence = &feb5[0].task;

    let update = UpdateTaskData {
        title: Some("Physio (rescheduled)".to_string()),
        scheduled_date: Some(date(2025, 2, 6)),
        ..Default::default()
    };
    let outcome = repo
        .update_task(occurrence.id, update, false)
        .await
        .unwrap();

    match outcome {
        UpdateOutcome::Single(detail) => {
            assert_eq!(detail.task.scheduled_date, Some(date(2025, 2, 6)));
            assert_eq!(detail.task.title, "Physio (rescheduled)");
        }
        UpdateOutcome::Series(_) => panic!("expected a single outcome"),
    }

    // the rest of the family is where it was
    assert_eq!(repo.tasks_for_day(user, date(2025, 2, 12)).await.unwrap().len(), 1);
    assert_eq!(repo.tasks_for_day(user, date(2025, 2, 19)).await.unwrap().len(), 1);
    assert!(repo.tasks_for_day(user, date(2025, 2, 5)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_series_edit_ignores_submitted_scheduled_date() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();
    let base = seed_spanning_family(&repo, user).await;

    let update = UpdateTaskData {
        scheduled_date: Some(date(2025, 6, 1)),
        ..Default::default()
    };
    repo.update_task(base.task.id, update, true).await.unwrap();

    let reloaded = repo.find_task_by_id(base.task.id).await.unwrap().unwrap();
    assert_eq!(reloaded.scheduled_date, Some(date(2025, 1, 1)));
}

#[tokio::test]
async fn test_moved_range_cutoff_spares_interim_occurrences() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();
    let base = seed_spanning_family(&repo, user).await;

    // push the range forward: both prior dates existed, so the cutoff
    // becomes the new start (Feb 15), not today (Feb 1)
    let update = UpdateTaskData {
        recurrent_start_date: Some(date(2025, 2, 15)),
        recurrent_end_date: Some(date(2025, 3, 15)),
        ..Default::default()
    };
    repo.update_task(base.task.id, update, true).await.unwrap();

    // occurrences between today and the new start are below the cutoff
    // and survive untouched
    assert_eq!(repo.tasks_for_day(user, date(2025, 2, 5)).await.unwrap().len(), 1);
    assert_eq!(repo.tasks_for_day(user, date(2025, 2, 12)).await.unwrap().len(), 1);

    // Wednesdays from the new start through the new end now exist
    for (m, d) in [(2u32, 19u32), (2, 26), (3, 5), (3, 12)] {
        assert_eq!(
            repo.tasks_for_day(user, date(2025, m, d)).await.unwrap().len(),
            1,
            "missing occurrence on 2025-{m}-{d}"
        );
    }
}

#[tokio::test]
async fn test_completing_last_subtask_completes_task() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    let mut data = basic_task("Morning routine");
    data.subtasks = vec![subtask("a"), subtask("b"), subtask("c")];
    let detail = repo.create_task(user, data).await.unwrap();
    assert_eq!(detail.subtasks.len(), 3);

    for (i, sub) in detail.subtasks.iter().enumerate() {
        repo.update_subtask_status(sub.id, TaskStatus::Completed, user)
            .await
            .unwrap();

        let task = repo.find_task_by_id(detail.task.id).await.unwrap().unwrap();
        if i < detail.subtasks.len() - 1 {
            assert_eq!(task.status, TaskStatus::Pending, "completed too early");
        } else {
            assert_eq!(task.status, TaskStatus::Completed);
        }
    }
}

#[tokio::test]
async fn test_reopening_a_subtask_reopens_the_task() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    let mut data = basic_task("Morning routine");
    data.subtasks = vec![subtask("a"), subtask("b")];
    let detail = repo.create_task(user, data).await.unwrap();

    for sub in &detail.subtasks {
        repo.update_subtask_status(sub.id, TaskStatus::Completed, user)
            .await
            .unwrap();
    }
    let task = repo.find_task_by_id(detail.task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let reopened = repo
        .update_subtask_status(detail.subtasks[0].id, TaskStatus::Pending, user)
        .await
        .unwrap();
    assert_eq!(reopened.status, TaskStatus::Pending);

    let task = repo.find_task_by_id(detail.task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_subtask_status_requires_ownership() {
    let (repo, _tmp) = setup_test_db().await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let detail = repo.create_task(owner, basic_task("Laundry")).await.unwrap();
    let result = repo
        .update_subtask_status(detail.subtasks[0].id, TaskStatus::Completed, stranger)
        .await;

    assert!(matches!(result, Err(CoreError::PermissionDenied(_))));

    // status untouched
    let sub = repo
        .find_subtask_by_id(detail.subtasks[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_subtask_sync_matches_by_external_id() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    let mut data = basic_task("Routine");
    data.subtasks = vec![subtask("a"), subtask("b")];
    let detail = repo.create_task(user, data).await.unwrap();
    let ext_a = detail.subtasks[0].external_id;

    // rename a, drop b, add a brand-new row
    let submitted = vec![
        SubtaskInput {
            external_id: Some(ext_a),
            title: "a renamed".to_string(),
            ..Default::default()
        },
        subtask("c"),
    ];
    let update = UpdateTaskData {
        subtasks: Some(submitted),
        ..Default::default()
    };
    repo.update_task(detail.task.id, update, false).await.unwrap();

    let after = repo.find_task_detail(detail.task.id).await.unwrap().unwrap();
    assert_eq!(after.subtasks.len(), 2);
    let renamed = after
        .subtasks
        .iter()
        .find(|s| s.external_id == ext_a)
        .expect("row a vanished");
    assert_eq!(renamed.title, "a renamed");
    assert_eq!(renamed.id, detail.subtasks[0].id, "row a was recreated");
    assert!(after.subtasks.iter().all(|s| s.title != "b"));
}

#[tokio::test]
async fn test_subtask_sync_is_idempotent() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    let mut data = basic_task("Routine");
    data.subtasks = vec![subtask("a"), subtask("b")];
    let detail = repo.create_task(user, data).await.unwrap();

    let submitted: Vec<SubtaskInput> = detail
        .subtasks
        .iter()
        .map(|s| SubtaskInput {
            external_id: Some(s.external_id),
            title: s.title.clone(),
            description: s.description.clone(),
            note: s.note.clone(),
            position: Some(s.position),
            status: Some(s.status),
            pictogram: None,
        })
        .collect();

    let update = UpdateTaskData {
        subtasks: Some(submitted),
        ..Default::default()
    };
    repo.update_task(detail.task.id, update.clone(), false)
        .await
        .unwrap();
    let first = repo.find_task_detail(detail.task.id).await.unwrap().unwrap();

    repo.update_task(detail.task.id, update, false).await.unwrap();
    let second = repo.find_task_detail(detail.task.id).await.unwrap().unwrap();

    let ids = |d: &TaskDetail| {
        let mut v: Vec<(Uuid, Uuid)> = d.subtasks.iter().map(|s| (s.id, s.external_id)).collect();
        v.sort();
        v
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(second.subtasks.len(), 2);
}

fn attachment(name: &str) -> NewAttachment {
    NewAttachment {
        file_name: name.to_string(),
        bytes: vec![0xAA, 0xBB],
    }
}

fn count_files(dir: &std::path::Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[tokio::test]
async fn test_deleting_a_task_removes_subtasks_and_attachments() {
    let (repo, tmp) = setup_test_db().await;
    let attachments_dir = tmp.path().join("attachments");
    let user = Uuid::new_v4();

    let mut data = basic_task("Routine");
    data.pictogram = Some(attachment("task.png"));
    data.subtasks = vec![
        SubtaskInput {
            title: "a".to_string(),
            pictogram: Some(attachment("a.png")),
            ..Default::default()
        },
        SubtaskInput {
            title: "b".to_string(),
            pictogram: Some(attachment("b.png")),
            ..Default::default()
        },
    ];
    let detail = repo.create_task(user, data).await.unwrap();
    assert_eq!(count_files(&attachments_dir), 3);

    repo.delete_task(user, detail.task.id, false).await.unwrap();

    assert!(repo.find_task_by_id(detail.task.id).await.unwrap().is_none());
    for sub in &detail.subtasks {
        assert!(repo.find_subtask_by_id(sub.id).await.unwrap().is_none());
    }
    assert_eq!(count_files(&attachments_dir), 0);
}

#[tokio::test]
async fn test_delete_requires_ownership() {
    let (repo, _tmp) = setup_test_db().await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let detail = repo.create_task(owner, basic_task("Laundry")).await.unwrap();
    let result = repo.delete_task(stranger, detail.task.id, false).await;
    assert!(matches!(result, Err(CoreError::PermissionDenied(_))));
    assert!(repo.find_task_by_id(detail.task.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_series_delete_spares_past_occurrences() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();
    let base = seed_spanning_family(&repo, user).await;

    let feb5 = repo.tasks_for_day(user, date(2025, 2, 5)).await.unwrap();
    repo.delete_task(user, feb5[0].task.id, true).await.unwrap();

    // January history survives, including the base task
    for (y, m, d) in JANUARY_WEDNESDAYS {
        assert_eq!(repo.tasks_for_day(user, date(y, m, d)).await.unwrap().len(), 1);
    }
    assert!(repo.find_task_by_id(base.task.id).await.unwrap().is_some());

    // every occurrence dated today or later is gone
    for d in [5u32, 12, 19, 26] {
        assert!(repo.tasks_for_day(user, date(2025, 2, d)).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_planned_window_is_inclusive() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    for day in [1u32, 3, 4, 5] {
        let mut data = basic_task(&format!("Task {day}"));
        data.scheduled_date = Some(date(2025, 2, day));
        repo.create_task(user, data).await.unwrap();
    }

    let planned = repo.planned_tasks(user, 3).await.unwrap();
    let dates: Vec<NaiveDate> = planned.iter().filter_map(|d| d.task.scheduled_date).collect();
    assert_eq!(
        dates,
        vec![date(2025, 2, 1), date(2025, 2, 3), date(2025, 2, 4)]
    );

    let today = repo.tasks_for_today(user).await.unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].task.title, "Task 1");
}

#[tokio::test]
async fn test_update_patch_preserves_absent_fields() {
    let (repo, _tmp) = setup_test_db().await;
    let user = Uuid::new_v4();

    let mut data = basic_task("Laundry");
    data.description = Some("whites only".to_string());
    data.color = Some("#aabbcc".to_string());
    let detail = repo.create_task(user, data).await.unwrap();

    let update = UpdateTaskData {
        title: Some("Laundry day".to_string()),
        ..Default::default()
    };
    let outcome = repo.update_task(detail.task.id, update, false).await.unwrap();

    let UpdateOutcome::Single(after) = outcome else {
        panic!("expected a single outcome");
    };
    assert_eq!(after.task.title, "Laundry day");
    assert_eq!(after.task.description.as_deref(), Some("whites only"));
    assert_eq!(after.task.color.as_deref(), Some("#aabbcc"));

    // explicit clear via the double-Option form
    let update = UpdateTaskData {
        description: Some(None),
        ..Default::default()
    };
    repo.update_task(detail.task.id, update, false).await.unwrap();
    let after = repo.find_task_by_id(detail.task.id).await.unwrap().unwrap();
    assert_eq!(after.description, None);
    assert_eq!(after.color.as_deref(), Some("#aabbcc"));
}
