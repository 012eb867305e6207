use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// where a reminder was created from. stored as the `metadata` jsonb column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReminderOrigin {
    SlashCommand {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command_id: Option<String>,
    },
    ContextMenu {
        #[serde(rename = "original_message_id")]
        message_id: String,
        #[serde(rename = "original_channel_id")]
        channel_id: String,
        #[serde(rename = "message_url")]
        url: String,
    },
}

impl ReminderOrigin {
    pub fn message_url(&self) -> Option<&str> {
        match self {
            ReminderOrigin::ContextMenu { url, .. } => Some(url),
            ReminderOrigin::SlashCommand { .. } => None,
        }
    }
}

/// why a reminder stopped being pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReminderOutcome {
    Delivered,
    Failed,
    Missed,
    Cancelled,
}

impl ReminderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderOutcome::Delivered => "delivered",
            ReminderOutcome::Failed => "failed",
            ReminderOutcome::Missed => "missed",
            ReminderOutcome::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReminderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivered" => Ok(ReminderOutcome::Delivered),
            "failed" => Ok(ReminderOutcome::Failed),
            "missed" => Ok(ReminderOutcome::Missed),
            "cancelled" => Ok(ReminderOutcome::Cancelled),
            other => Err(format!("unknown reminder outcome: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReminderState {
    Pending,
    Completed { outcome: Option<ReminderOutcome> },
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reminder {
    pub reminder_id: String,
    pub user_id: String,
    pub user_tag: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub is_completed: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub outcome: Option<ReminderOutcome>,
    pub metadata: ReminderOrigin,
}

impl Reminder {
    pub fn state(&self) -> ReminderState {
        match (self.is_completed, self.outcome) {
            (false, _) => ReminderState::Pending,
            (true, Some(ReminderOutcome::Cancelled)) => ReminderState::Cancelled,
            (true, outcome) => ReminderState::Completed { outcome },
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == ReminderState::Pending
    }

    /// whole minutes between creation and expiry.
    pub fn elapsed_minutes(&self) -> i64 {
        (self.expires_at - self.created_at).whole_minutes()
    }

    /// the last six characters of the id, shown to users.
    pub fn short_id(&self) -> &str {
        short_id(&self.reminder_id)
    }
}

pub fn short_id(reminder_id: &str) -> &str {
    let start = reminder_id
        .char_indices()
        .rev()
        .nth(5)
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    &reminder_id[start..]
}

/// a reminder that has been validated but not yet stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReminder {
    pub reminder_id: String,
    pub user_id: String,
    pub user_tag: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub metadata: ReminderOrigin,
}

/// what a command hands to the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderRequest {
    pub user_id: String,
    pub user_tag: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub message: String,
    pub minutes: i64,
    pub metadata: ReminderOrigin,
}

impl ReminderRequest {
    /// stamps the request with `now`, deriving the id and expiry from it.
    pub fn into_new_reminder(self, now: OffsetDateTime) -> NewReminder {
        let created_at = now;
        let expires_at = created_at + time::Duration::minutes(self.minutes);
        let millis = created_at.unix_timestamp_nanos() / 1_000_000;

        NewReminder {
            reminder_id: format!("{}-{}", self.user_id, millis),
            user_id: self.user_id,
            user_tag: self.user_tag,
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            message: self.message,
            created_at,
            expires_at,
            metadata: self.metadata,
        }
    }
}

impl NewReminder {
    /// the row as it looks right after insertion.
    pub fn into_pending(self) -> Reminder {
        Reminder {
            reminder_id: self.reminder_id,
            user_id: self.user_id,
            user_tag: self.user_tag,
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            message: self.message,
            created_at: self.created_at,
            expires_at: self.expires_at,
            is_completed: false,
            completed_at: None,
            outcome: None,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn request(minutes: i64) -> ReminderRequest {
        ReminderRequest {
            user_id: "1234".into(),
            user_tag: "someone".into(),
            channel_id: "42".into(),
            guild_id: None,
            message: "buy milk".into(),
            minutes,
            metadata: ReminderOrigin::SlashCommand { command_id: None },
        }
    }

    #[test]
    fn test_into_new_reminder() {
        let now = datetime!(2024-05-01 12:00:00.250 UTC);
        let new = request(90).into_new_reminder(now);

        assert_eq!(new.reminder_id, "1234-1714564800250");
        assert_eq!(new.created_at, now);
        assert_eq!(new.expires_at, datetime!(2024-05-01 13:30:00.250 UTC));

        let reminder = new.into_pending();
        assert_eq!(reminder.elapsed_minutes(), 90);
        assert_eq!(reminder.state(), ReminderState::Pending);
        assert_eq!(reminder.short_id(), "800250");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("123456"), "123456");
        assert_eq!(short_id("1-1234567"), "234567");
    }

    #[test]
    fn test_state() {
        let mut reminder = request(5)
            .into_new_reminder(datetime!(2024-05-01 12:00 UTC))
            .into_pending();

        reminder.is_completed = true;
        reminder.outcome = Some(ReminderOutcome::Failed);
        assert_eq!(
            reminder.state(),
            ReminderState::Completed {
                outcome: Some(ReminderOutcome::Failed)
            }
        );

        reminder.outcome = Some(ReminderOutcome::Cancelled);
        assert_eq!(reminder.state(), ReminderState::Cancelled);
        assert!(!reminder.is_pending());
    }

    #[test]
    fn test_origin_json_shape() {
        let origin = ReminderOrigin::ContextMenu {
            message_id: "10".into(),
            channel_id: "20".into(),
            url: "https://discord.com/channels/1/20/10".into(),
        };

        let value = serde_json::to_value(&origin).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "source": "context_menu",
                "original_message_id": "10",
                "original_channel_id": "20",
                "message_url": "https://discord.com/channels/1/20/10",
            })
        );

        let slash: ReminderOrigin =
            serde_json::from_value(serde_json::json!({ "source": "slash_command" })).unwrap();
        assert_eq!(slash, ReminderOrigin::SlashCommand { command_id: None });
        assert_eq!(slash.message_url(), None);
        assert_eq!(
            origin.message_url(),
            Some("https://discord.com/channels/1/20/10")
        );
    }

    #[test]
    fn test_outcome_round_trips_through_str() {
        for outcome in [
            ReminderOutcome::Delivered,
            ReminderOutcome::Failed,
            ReminderOutcome::Missed,
            ReminderOutcome::Cancelled,
        ] {
            assert_eq!(outcome.as_str().parse::<ReminderOutcome>(), Ok(outcome));
        }

        assert!("snoozed".parse::<ReminderOutcome>().is_err());
    }
}
