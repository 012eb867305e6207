use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;

use super::{ReminderStore, StoreError};
use crate::models::reminder::{NewReminder, Reminder, ReminderOrigin, ReminderOutcome};

#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    reminder_id: String,
    user_id: String,
    user_tag: String,
    channel_id: String,
    guild_id: Option<String>,
    message: String,
    created_at: OffsetDateTime,
    expires_at: OffsetDateTime,
    is_completed: bool,
    completed_at: Option<OffsetDateTime>,
    outcome: Option<String>,
    metadata: Json<ReminderOrigin>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = StoreError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let outcome = row
            .outcome
            .as_deref()
            .map(str::parse::<ReminderOutcome>)
            .transpose()
            .map_err(|message| StoreError::InvalidRow {
                id: row.reminder_id.clone(),
                message,
            })?;

        Ok(Reminder {
            reminder_id: row.reminder_id,
            user_id: row.user_id,
            user_tag: row.user_tag,
            channel_id: row.channel_id,
            guild_id: row.guild_id,
            message: row.message,
            created_at: row.created_at,
            expires_at: row.expires_at,
            is_completed: row.is_completed,
            completed_at: row.completed_at,
            outcome,
            metadata: row.metadata.0,
        })
    }
}

fn into_reminders(rows: Vec<ReminderRow>) -> Result<Vec<Reminder>, StoreError> {
    rows.into_iter().map(Reminder::try_from).collect()
}

#[derive(Clone)]
pub struct PgReminderStore {
    pool: PgPool,
}

impl PgReminderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    #[tracing::instrument(skip_all, fields(reminder_id = %reminder.reminder_id))]
    async fn save(&self, reminder: &NewReminder) -> Result<Reminder, StoreError> {
        let result = sqlx::query_as::<_, ReminderRow>(
            r#"
                INSERT INTO reminders (
                    reminder_id, user_id, user_tag, channel_id, guild_id,
                    message, created_at, expires_at, metadata
                )
                VALUES
                    ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *;
            "#,
        )
        .bind(&reminder.reminder_id)
        .bind(&reminder.user_id)
        .bind(&reminder.user_tag)
        .bind(&reminder.channel_id)
        .bind(&reminder.guild_id)
        .bind(&reminder.message)
        .bind(reminder.created_at)
        .bind(reminder.expires_at)
        .bind(Json(&reminder.metadata))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Reminder::try_from(row),
            Err(e)
                if e.as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation()) =>
            {
                tracing::warn!("reminder id already exists");
                Err(StoreError::DuplicateKey(reminder.reminder_id.clone()))
            }
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when saving reminder");
                Err(e.into())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn complete(
        &self,
        reminder_id: &str,
        outcome: ReminderOutcome,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
                UPDATE reminders
                SET
                    is_completed = TRUE,
                    completed_at = NOW(),
                    outcome = $2
                WHERE
                    reminder_id = $1 AND is_completed = FALSE;
            "#,
        )
        .bind(reminder_id)
        .bind(outcome.as_str())
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when completing reminder"))?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn record_outcome(
        &self,
        reminder_id: &str,
        outcome: ReminderOutcome,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
                UPDATE reminders
                SET outcome = $2
                WHERE
                    reminder_id = $1 AND is_completed = TRUE;
            "#,
        )
        .bind(reminder_id)
        .bind(outcome.as_str())
        .execute(&self.pool)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when recording reminder outcome"),
        )?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn cancel(&self, reminder_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
                UPDATE reminders
                SET
                    is_completed = TRUE,
                    completed_at = NOW(),
                    outcome = $3
                WHERE
                    reminder_id = $1 AND user_id = $2 AND is_completed = FALSE;
            "#,
        )
        .bind(reminder_id)
        .bind(user_id)
        .bind(ReminderOutcome::Cancelled.as_str())
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when cancelling reminder"))?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn cleanup(&self, retention_days: i32) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
                DELETE FROM reminders
                WHERE
                    is_completed = TRUE
                    AND completed_at < NOW() - make_interval(days => $1);
            "#,
        )
        .bind(retention_days)
        .execute(&self.pool)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when cleaning up old reminders"),
        )?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn get_active(&self) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
                SELECT * FROM reminders
                WHERE
                    is_completed = FALSE AND expires_at > NOW()
                ORDER BY expires_at ASC;
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching active reminders"),
        )?;

        into_reminders(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn get_pending(&self) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
                SELECT * FROM reminders
                WHERE
                    is_completed = FALSE
                ORDER BY expires_at ASC;
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching pending reminders"),
        )?;

        into_reminders(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, reminder_id: &str) -> Result<Option<Reminder>, StoreError> {
        let row = sqlx::query_as::<_, ReminderRow>(
            r#"
                SELECT * FROM reminders
                WHERE reminder_id = $1;
            "#,
        )
        .bind(reminder_id)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when fetching reminder"))?;

        row.map(Reminder::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
                SELECT * FROM reminders
                WHERE user_id = $1
                ORDER BY created_at DESC
                LIMIT $2;
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching user reminders"),
        )?;

        into_reminders(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn find_pending_by_suffix(
        &self,
        user_id: &str,
        suffix: &str,
    ) -> Result<Option<Reminder>, StoreError> {
        if suffix.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, ReminderRow>(
            r#"
                SELECT * FROM reminders
                WHERE
                    user_id = $1
                    AND is_completed = FALSE
                    AND reminder_id LIKE '%' || $2
                ORDER BY created_at DESC
                LIMIT 1;
            "#,
        )
        .bind(user_id)
        .bind(escape_like(suffix))
        .fetch_optional(&self.pool)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when looking up reminder by suffix"),
        )?;

        row.map(Reminder::try_from).transpose()
    }
}

/// escapes `LIKE` wildcards so user input only ever matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
