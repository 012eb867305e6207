use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use super::{ReminderStore, StoreError};
use crate::models::reminder::{NewReminder, Reminder, ReminderOutcome};

/// a [`ReminderStore`] backed by a hash map, for exercising the scheduler.
#[derive(Default)]
pub struct MemoryReminderStore {
    rows: Mutex<HashMap<String, Reminder>>,
    pub fail_saves: AtomicBool,
    pub fail_completes: AtomicBool,
    pub fail_cancels: AtomicBool,
    pub fail_cleanups: AtomicBool,
    pub complete_calls: AtomicUsize,
    pub cleanup_calls: AtomicUsize,
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl MemoryReminderStore {
    pub fn insert(&self, reminder: Reminder) {
        self.rows
            .lock()
            .unwrap()
            .insert(reminder.reminder_id.clone(), reminder);
    }

    pub fn get(&self, reminder_id: &str) -> Option<Reminder> {
        self.rows.lock().unwrap().get(reminder_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// pushes a completed reminder's completion time into the past.
    pub fn backdate_completion(&self, reminder_id: &str, by: Duration) {
        if let Some(reminder) = self.rows.lock().unwrap().get_mut(reminder_id) {
            reminder.completed_at = reminder.completed_at.map(|at| at - by);
        }
    }

    fn sorted_by_expiry(&self, filter: impl Fn(&Reminder) -> bool) -> Vec<Reminder> {
        let mut reminders: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| filter(r))
            .cloned()
            .collect();

        reminders.sort_by_key(|r| r.expires_at);
        reminders
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn save(&self, reminder: &NewReminder) -> Result<Reminder, StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let mut rows = self.rows.lock().unwrap();

        if rows.contains_key(&reminder.reminder_id) {
            return Err(StoreError::DuplicateKey(reminder.reminder_id.clone()));
        }

        let stored = reminder.clone().into_pending();
        rows.insert(stored.reminder_id.clone(), stored.clone());

        Ok(stored)
    }

    async fn complete(
        &self,
        reminder_id: &str,
        outcome: ReminderOutcome,
    ) -> Result<bool, StoreError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_completes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        match self.rows.lock().unwrap().get_mut(reminder_id) {
            Some(reminder) if !reminder.is_completed => {
                reminder.is_completed = true;
                reminder.completed_at = Some(OffsetDateTime::now_utc());
                reminder.outcome = Some(outcome);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_outcome(
        &self,
        reminder_id: &str,
        outcome: ReminderOutcome,
    ) -> Result<(), StoreError> {
        if let Some(reminder) = self.rows.lock().unwrap().get_mut(reminder_id) {
            if reminder.is_completed {
                reminder.outcome = Some(outcome);
            }
        }

        Ok(())
    }

    async fn cancel(&self, reminder_id: &str, user_id: &str) -> Result<bool, StoreError> {
        if self.fail_cancels.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        match self.rows.lock().unwrap().get_mut(reminder_id) {
            Some(reminder) if reminder.user_id == user_id && !reminder.is_completed => {
                reminder.is_completed = true;
                reminder.completed_at = Some(OffsetDateTime::now_utc());
                reminder.outcome = Some(ReminderOutcome::Cancelled);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cleanup(&self, retention_days: i32) -> Result<u64, StoreError> {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_cleanups.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let cutoff = OffsetDateTime::now_utc() - Duration::days(retention_days.into());
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();

        rows.retain(|_, r| !(r.is_completed && r.completed_at.is_some_and(|at| at < cutoff)));

        Ok((before - rows.len()) as u64)
    }

    async fn get_active(&self) -> Result<Vec<Reminder>, StoreError> {
        let now = OffsetDateTime::now_utc();
        Ok(self.sorted_by_expiry(|r| !r.is_completed && r.expires_at > now))
    }

    async fn get_pending(&self) -> Result<Vec<Reminder>, StoreError> {
        Ok(self.sorted_by_expiry(|r| !r.is_completed))
    }

    async fn get_by_id(&self, reminder_id: &str) -> Result<Option<Reminder>, StoreError> {
        Ok(self.get(reminder_id))
    }

    async fn get_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Reminder>, StoreError> {
        let mut reminders: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();

        reminders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reminders.truncate(limit.max(0) as usize);

        Ok(reminders)
    }

    async fn find_pending_by_suffix(
        &self,
        user_id: &str,
        suffix: &str,
    ) -> Result<Option<Reminder>, StoreError> {
        if suffix.is_empty() {
            return Ok(None);
        }

        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id && !r.is_completed && r.reminder_id.ends_with(suffix))
            .max_by_key(|r| r.created_at)
            .cloned())
    }
}
