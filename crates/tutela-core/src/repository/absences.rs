//! Absence bookkeeping and the oracle the recurrence engine consults.
//!
//! The engine itself only reads: an occurrence is skipped when the user has
//! any absence record on that exact date. Weekend and holiday-template
//! checks are a separate concern layered above this one and do not belong
//! to the oracle.

use crate::error::CoreError;
use crate::models::{AbsenceKind, UserAbsence};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::AbsenceOracle for SqliteRepository {
    async fn is_absent(&self, user_id: Uuid, date: NaiveDate) -> Result<bool, CoreError> {
        let hit: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM user_absences WHERE user_id = $1 AND date = $2 LIMIT 1",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(self.pool())
        .await?;
        Ok(hit.is_some())
    }
}

#[async_trait]
impl super::AbsenceRepository for SqliteRepository {
    async fn record_absence(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        kind: AbsenceKind,
        note: Option<String>,
    ) -> Result<UserAbsence, CoreError> {
        let absence = UserAbsence {
            id: Uuid::now_v7(),
            user_id,
            date,
            kind,
            note,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO user_absences (id, user_id, date, kind, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(absence.id)
        .bind(absence.user_id)
        .bind(absence.date)
        .bind(absence.kind)
        .bind(&absence.note)
        .bind(absence.created_at)
        .execute(self.pool())
        .await?;

        Ok(absence)
    }

    async fn remove_absence(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM user_absences WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn absences_for_user(&self, user_id: Uuid) -> Result<Vec<UserAbsence>, CoreError> {
        let absences = sqlx::query_as(
            "SELECT * FROM user_absences WHERE user_id = $1 ORDER BY date",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(absences)
    }
}

impl SqliteRepository {
    /// Oracle check usable mid-transaction, so occurrence generation sees
    /// a consistent snapshot.
    pub(crate) async fn is_absent_in_transaction<'a>(
        tx: &mut Transaction<'a, Sqlite>,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, CoreError> {
        let hit: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM user_absences WHERE user_id = $1 AND date = $2 LIMIT 1",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(hit.is_some())
    }
}
