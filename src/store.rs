use async_trait::async_trait;

use crate::models::reminder::{NewReminder, Reminder, ReminderOutcome};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgReminderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reminder {0} already exists")]
    DuplicateKey(String),

    #[error("reminder {id} has an invalid row: {message}")]
    InvalidRow { id: String, message: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// persistence for the `reminders` table. every method is a single statement.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// inserts a new reminder, failing with [`StoreError::DuplicateKey`] if the id is taken.
    async fn save(&self, reminder: &NewReminder) -> Result<Reminder, StoreError>;

    /// marks a pending reminder completed. returns whether this call completed
    /// it; unknown or already completed ids return `false` rather than an error.
    async fn complete(&self, reminder_id: &str, outcome: ReminderOutcome)
        -> Result<bool, StoreError>;

    /// overwrites the outcome of an already completed reminder.
    async fn record_outcome(
        &self,
        reminder_id: &str,
        outcome: ReminderOutcome,
    ) -> Result<(), StoreError>;

    /// marks a pending reminder owned by `user_id` as cancelled.
    /// returns whether a row changed.
    async fn cancel(&self, reminder_id: &str, user_id: &str) -> Result<bool, StoreError>;

    /// deletes completed reminders older than `retention_days`, returning the count.
    async fn cleanup(&self, retention_days: i32) -> Result<u64, StoreError>;

    /// pending reminders that have not expired yet, soonest first.
    async fn get_active(&self) -> Result<Vec<Reminder>, StoreError>;

    /// every pending reminder, including overdue ones, soonest first.
    async fn get_pending(&self) -> Result<Vec<Reminder>, StoreError>;

    async fn get_by_id(&self, reminder_id: &str) -> Result<Option<Reminder>, StoreError>;

    /// a user's reminders, newest first.
    async fn get_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Reminder>, StoreError>;

    /// the newest pending reminder of `user_id` whose id ends with `suffix`.
    async fn find_pending_by_suffix(
        &self,
        user_id: &str,
        suffix: &str,
    ) -> Result<Option<Reminder>, StoreError>;
}
