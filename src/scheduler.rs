use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use futures::StreamExt;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{
    models::reminder::{Reminder, ReminderOutcome, ReminderRequest},
    notifier::ReminderNotifier,
    store::{ReminderStore, StoreError},
};

/// how long to wait before retrying a reminder whose claim failed to write.
const CLAIM_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// completed reminders older than this are purged by the sweep.
    pub retention_days: i32,
    pub sweep_interval: std::time::Duration,
    /// overdue reminders found on startup are still delivered if they are
    /// at most this late, and marked missed otherwise.
    pub missed_grace: time::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            sweep_interval: std::time::Duration::from_secs(60 * 60),
            missed_grace: time::Duration::hours(1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelResult {
    Cancelled,
    NotFound,
    /// the reminder already completed, or is being delivered right now.
    AlreadyCompleted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RehydrateSummary {
    pub rearmed: usize,
    pub overdue: usize,
    pub missed: usize,
}

/// owns every armed reminder timer for the process.
///
/// each pending reminder gets one spawned task that sleeps until the reminder
/// expires and then delivers it. the task's handle lives in `timers` until
/// either the task fires or the reminder is cancelled; whichever removes the
/// handle first gets to act on the reminder.
pub struct ReminderScheduler {
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn ReminderNotifier>,
    config: SchedulerConfig,
    timers: DashMap<String, JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn ReminderNotifier>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            notifier,
            config,
            timers: DashMap::new(),
        })
    }

    pub fn store(&self) -> &dyn ReminderStore {
        self.store.as_ref()
    }

    /// the number of reminders currently waiting on a timer.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_armed(&self, reminder_id: &str) -> bool {
        self.timers.contains_key(reminder_id)
    }

    /// persists a new reminder and arms its timer. nothing is armed if saving fails.
    #[tracing::instrument(skip_all, fields(user_id = %request.user_id, minutes = request.minutes))]
    pub async fn create(self: &Arc<Self>, request: ReminderRequest) -> Result<Reminder, StoreError> {
        let new_reminder = request.into_new_reminder(OffsetDateTime::now_utc());

        let reminder = self.store.save(&new_reminder).await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when saving reminder to database"),
        )?;

        self.arm(reminder.clone());

        tracing::info!(
            reminder_id = %reminder.reminder_id,
            expires_at = %reminder.expires_at,
            "reminder set"
        );

        Ok(reminder)
    }

    /// schedules delivery of `reminder` at its expiry. already-expired
    /// reminders fire right away. arming the same id twice is a no-op.
    pub fn arm(self: &Arc<Self>, reminder: Reminder) {
        let delay = std::time::Duration::try_from(reminder.expires_at - OffsetDateTime::now_utc())
            .unwrap_or(std::time::Duration::ZERO);

        self.arm_after(reminder, delay);
    }

    fn arm_after(self: &Arc<Self>, reminder: Reminder, delay: std::time::Duration) {
        // the entry stays locked until the handle is stored, so the task can
        // never observe the map before its own handle is in it.
        match self.timers.entry(reminder.reminder_id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(reminder_id = %reminder.reminder_id, "reminder is already armed");
            }
            Entry::Vacant(entry) => {
                let scheduler = Arc::clone(self);
                let span = tracing::info_span!("reminder_timer", reminder_id = %reminder.reminder_id);

                let handle = tokio::spawn(
                    async move {
                        tokio::time::sleep(delay).await;
                        scheduler.fire(reminder).await;
                    }
                    .instrument(span),
                );

                entry.insert(handle);
            }
        }
    }

    /// claims a due reminder, delivers it once and records how that went.
    ///
    /// the row is completed as `failed` before anything is sent and only
    /// upgraded to `delivered` afterwards, so a reminder is never sent while
    /// its row is still pending and a restart cannot deliver it a second time.
    async fn fire(self: &Arc<Self>, reminder: Reminder) {
        if self.timers.remove(&reminder.reminder_id).is_none() {
            tracing::debug!("reminder was cancelled before it fired");
            return;
        }

        match self
            .store
            .complete(&reminder.reminder_id, ReminderOutcome::Failed)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("reminder was already completed elsewhere");
                return;
            }
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when claiming reminder");
                self.retry_claim(reminder);
                return;
            }
        }

        match self.notifier.deliver(&reminder).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %reminder.user_id,
                    user_tag = %reminder.user_tag,
                    "successfully sent reminder"
                );

                if let Err(e) = self
                    .store
                    .record_outcome(&reminder.reminder_id, ReminderOutcome::Delivered)
                    .await
                {
                    tracing::error!(err = ?e, "an error occurred when recording reminder delivery");
                }
            }
            Err(e) => {
                tracing::error!(
                    err = ?e,
                    user_id = %reminder.user_id,
                    user_tag = %reminder.user_tag,
                    "failed to send reminder"
                );
            }
        }
    }

    /// re-arms a reminder whose claim could not be written, until it is later
    /// than the missed grace window. past that it stays pending for the next
    /// [`ReminderScheduler::rehydrate`] to mark missed.
    fn retry_claim(self: &Arc<Self>, reminder: Reminder) {
        if OffsetDateTime::now_utc() - reminder.expires_at > self.config.missed_grace {
            tracing::warn!("giving up on reminder, it is past the missed grace window");
            return;
        }

        self.arm_after(reminder, CLAIM_RETRY_DELAY);
    }

    /// cancels one of `user_id`'s pending reminders.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        self: &Arc<Self>,
        reminder_id: &str,
        user_id: &str,
    ) -> Result<CancelResult, StoreError> {
        let reminder = match self.store.get_by_id(reminder_id).await? {
            Some(reminder) if reminder.user_id == user_id => reminder,
            _ => return Ok(CancelResult::NotFound),
        };

        if !reminder.is_pending() {
            return Ok(CancelResult::AlreadyCompleted);
        }

        let disarmed = match self.timers.remove(reminder_id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            // no timer and already due means the timer task claimed it and is delivering.
            None if reminder.expires_at <= OffsetDateTime::now_utc() => {
                return Ok(CancelResult::AlreadyCompleted);
            }
            None => false,
        };

        let cancelled = match self.store.cancel(reminder_id, user_id).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when cancelling reminder");

                // the row is still pending, so it keeps its timer.
                if disarmed {
                    self.arm(reminder);
                }

                return Err(e);
            }
        };

        if cancelled {
            tracing::info!("reminder cancelled");
            Ok(CancelResult::Cancelled)
        } else {
            Ok(CancelResult::AlreadyCompleted)
        }
    }

    /// re-arms timers for reminders persisted before a restart.
    ///
    /// future reminders are armed as usual, reminders that are late by at most
    /// [`SchedulerConfig::missed_grace`] fire immediately, and anything older
    /// is marked missed without being delivered.
    #[tracing::instrument(skip_all)]
    pub async fn rehydrate(self: &Arc<Self>) -> Result<RehydrateSummary, StoreError> {
        let pending = self.store.get_pending().await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching pending reminders"),
        )?;

        let now = OffsetDateTime::now_utc();
        let mut summary = RehydrateSummary::default();

        for reminder in pending {
            if self.is_armed(&reminder.reminder_id) {
                continue;
            }

            if reminder.expires_at > now {
                summary.rearmed += 1;
                self.arm(reminder);
            } else if now - reminder.expires_at <= self.config.missed_grace {
                summary.overdue += 1;
                self.arm(reminder);
            } else {
                match self
                    .store
                    .complete(&reminder.reminder_id, ReminderOutcome::Missed)
                    .await
                {
                    Ok(true) => summary.missed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(err = ?e, reminder_id = %reminder.reminder_id, "an error occurred when marking reminder missed");
                    }
                }
            }
        }

        tracing::info!(
            rearmed = summary.rearmed,
            overdue = summary.overdue,
            missed = summary.missed,
            "rehydrated reminders"
        );

        Ok(summary)
    }

    /// purges completed reminders past the retention window.
    #[tracing::instrument(skip_all)]
    pub async fn sweep(&self) -> Result<u64, StoreError> {
        let deleted = self
            .store
            .cleanup(self.config.retention_days)
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred during reminder cleanup"))?;

        if deleted > 0 {
            tracing::info!(deleted, "cleaned up old completed reminders");
        }

        Ok(deleted)
    }

    /// runs [`ReminderScheduler::sweep`] every `sweep_interval`, forever,
    /// starting one interval from now.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);

        tokio::spawn(
            async move {
                let period = scheduler.config.sweep_interval;
                let interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                let task = futures::stream::unfold(interval, |mut interval| async {
                    interval.tick().await;
                    let _ = scheduler.sweep().await;

                    Some(((), interval))
                });

                task.for_each(|_| async {}).await;
            }
            .in_current_span(),
        )
    }
}
