use std::{num::NonZeroU64, sync::Arc};

use async_trait::async_trait;
use poise::serenity_prelude::{
    CreateEmbed, CreateEmbedFooter, CreateMessage, Http, Mentionable, Timestamp, UserId,
};

use crate::{
    constants::embeds::REMINDER_COLOUR, models::reminder::Reminder,
    validation::format_time_string, Error,
};

/// delivers a fired reminder to its owner.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn deliver(&self, reminder: &Reminder) -> Result<(), Error>;
}

/// sends reminders as direct messages through the discord http api.
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ReminderNotifier for DiscordNotifier {
    #[tracing::instrument(skip_all, fields(reminder_id = %reminder.reminder_id, user_id = %reminder.user_id))]
    async fn deliver(&self, reminder: &Reminder) -> Result<(), Error> {
        let user_id = UserId::from(reminder.user_id.parse::<NonZeroU64>()?);

        let user = user_id
            .to_user(self.http.as_ref())
            .await
            .inspect_err(|e| tracing::warn!(err = ?e, "an error occurred when fetching user"))?;

        user.direct_message(
            self.http.as_ref(),
            CreateMessage::new()
                .content(user.mention().to_string())
                .embed(reminder_embed(reminder)),
        )
        .await
        .inspect_err(
            |e| tracing::warn!(err = ?e, "an error occurred when sending reminder direct message"),
        )?;

        Ok(())
    }
}

/// the embed a user receives when their reminder fires.
pub fn reminder_embed(reminder: &Reminder) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .colour(REMINDER_COLOUR)
        .title("⏰ Reminder!")
        .description(format!(
            "You asked me to remind you about:\n\n*{}*",
            reminder.message
        ))
        .field(
            "⏱️ Time elapsed",
            format_time_string(reminder.elapsed_minutes()),
            true,
        )
        .field(
            "📅 Original time",
            format!("<t:{}:f>", reminder.created_at.unix_timestamp()),
            true,
        )
        .footer(CreateEmbedFooter::new(format!(
            "Reminder ID: {}",
            reminder.short_id()
        )))
        .timestamp(Timestamp::now());

    match reminder.metadata.message_url() {
        Some(url) => embed.field(
            "🔗 Original Message",
            format!("[Jump to message]({url})"),
            false,
        ),
        None if reminder.message.contains("http") => {
            embed.field("🔗 Message Link", reminder.message.clone(), false)
        }
        None => embed,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use time::macros::datetime;

    use super::*;
    use crate::models::reminder::{ReminderOrigin, ReminderRequest};

    fn make_reminder(message: &str, metadata: ReminderOrigin) -> Reminder {
        ReminderRequest {
            user_id: "1234".into(),
            user_tag: "tester".into(),
            channel_id: "42".into(),
            guild_id: None,
            message: message.into(),
            minutes: 90,
            metadata,
        }
        .into_new_reminder(datetime!(2024-05-01 12:00 UTC))
        .into_pending()
    }

    fn field_names(embed: &Value) -> Vec<&str> {
        embed["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_reminder_embed_slash_command() {
        let reminder = make_reminder("buy milk", ReminderOrigin::SlashCommand { command_id: None });
        let embed = serde_json::to_value(reminder_embed(&reminder)).unwrap();

        assert_eq!(embed["title"], "⏰ Reminder!");
        assert_eq!(
            embed["description"],
            "You asked me to remind you about:\n\n*buy milk*"
        );
        assert_eq!(embed["fields"][0]["value"], "1h 30m");
        assert_eq!(embed["fields"][1]["value"], "<t:1714564800:f>");
        assert_eq!(embed["footer"]["text"], "Reminder ID: 800000");
        assert_eq!(field_names(&embed), vec!["⏱️ Time elapsed", "📅 Original time"]);
    }

    #[test]
    fn test_reminder_embed_links() {
        let reminder = make_reminder(
            "read https://example.com",
            ReminderOrigin::SlashCommand { command_id: None },
        );
        let embed = serde_json::to_value(reminder_embed(&reminder)).unwrap();

        assert_eq!(field_names(&embed)[2], "🔗 Message Link");
        assert_eq!(embed["fields"][2]["value"], "read https://example.com");

        let reminder = make_reminder(
            "\"see https://example.com\"",
            ReminderOrigin::ContextMenu {
                message_id: "10".into(),
                channel_id: "20".into(),
                url: "https://discord.com/channels/1/20/10".into(),
            },
        );
        let embed = serde_json::to_value(reminder_embed(&reminder)).unwrap();

        assert_eq!(
            field_names(&embed),
            vec!["⏱️ Time elapsed", "📅 Original time", "🔗 Original Message"]
        );
        assert_eq!(
            embed["fields"][2]["value"],
            "[Jump to message](https://discord.com/channels/1/20/10)"
        );
    }
}
