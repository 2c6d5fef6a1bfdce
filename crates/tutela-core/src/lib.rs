//! # Tutela Core Library
//!
//! Scheduling engine for supervised end users: weekly recurring task
//! families, a subtask completion workflow with parent-status propagation,
//! and absence-aware occurrence planning.
//!
//! ## Features
//!
//! - **Weekly Recurrence Families**: a task plus a weekday set and date
//!   range expands into concrete dated occurrences
//! - **Series Reconciliation**: editing a family diffs desired against
//!   persisted future occurrences and converges them without touching
//!   history before the cutoff date
//! - **Absence Awareness**: occurrences are never scheduled on days the
//!   user is on vacation or legally absent
//! - **Subtask Workflow**: checklist items matched across requests by a
//!   client-stable external identifier; completing the last one completes
//!   the parent task
//! - **Type Safety**: typed SQL via sqlx with transactional multi-row
//!   mutation throughout
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`schedule`]: Weekday sets and occurrence date generation
//! - [`clock`]: Injected "today" provider
//! - [`attachments`]: Pictogram attachment store
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tutela_core::{
//!     attachments::FsAttachmentStore,
//!     clock::SystemClock,
//!     db,
//!     error::CoreError,
//!     models::{NewTaskData, SubtaskInput},
//!     repository::{Repository, SqliteRepository, TaskRepository},
//! };
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CoreError> {
//!     let pool = db::establish_connection("tutela.db").await?;
//!     let repo = SqliteRepository::new(
//!         pool,
//!         Arc::new(SystemClock),
//!         Arc::new(FsAttachmentStore::new("attachments")),
//!     );
//!
//!     let data = NewTaskData {
//!         title: "Morning routine".to_string(),
//!         subtasks: vec![SubtaskInput {
//!             title: "Brush teeth".to_string(),
//!             ..Default::default()
//!         }],
//!         is_recurrent: true,
//!         days_of_week: vec!["monday".into(), "wednesday".into()],
//!         ..Default::default()
//!     };
//!
//!     let detail = repo.create_task(Uuid::new_v4(), data).await?;
//!     println!("Created task: {}", detail.task.title);
//!
//!     Ok(())
//! }
//! ```

pub mod attachments;
pub mod clock;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod schedule;
