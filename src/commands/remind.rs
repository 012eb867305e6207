use std::time::Duration;

use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter, Timestamp};

use crate::{
    commands::{error_embed, reply_ephemeral},
    constants::embeds::REMINDER_COLOUR,
    models::reminder::{Reminder, ReminderOrigin, ReminderRequest},
    validation::{
        format_time_string, parse_reminder_duration, parse_time_string, sanitize_input,
        sanitize_reminder_message, validate_reminder_minutes, MAX_MESSAGE_LENGTH,
    },
    ApplicationContext, Context, Error,
};

const SAVE_FAILED: &str = "Failed to save your reminder. Please try again later.";

#[derive(Debug, poise::Modal)]
#[name = "⏰ Set Reminder"]
struct RemindModal {
    #[name = "When to remind you? (e.g., 10m, 1h, 2h30m)"]
    #[placeholder = "10m, 1h, or 2h30m"]
    #[min_length = 2]
    #[max_length = 10]
    time: String,
}

/// set a reminder.
#[poise::command(slash_command, user_cooldown = 5, ephemeral)]
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id))]
pub async fn remind(
    ctx: Context<'_>,
    #[description = "when to remind you (e.g., 1h, 30m, 5h30m)"] time: String,
    #[description = "what to remind you about"] message: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral()
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when deferring reply"))?;

    let author = ctx.author();

    tracing::info!(
        user_tag = %author.tag(),
        message_length = message.len(),
        channel_id = %ctx.channel_id(),
        "reminder requested"
    );

    let checked = parse_time_string(time.trim()).and_then(|minutes| {
        let message = sanitize_reminder_message(&message)?;
        Ok((validate_reminder_minutes(minutes)?, message))
    });

    let (minutes, message) = match checked {
        Ok(checked) => checked,
        Err(e) => {
            tracing::warn!(err = %e, "rejected reminder request");
            return reply_ephemeral(ctx, e.user_message()).await;
        }
    };

    let request = ReminderRequest {
        user_id: author.id.to_string(),
        user_tag: author.tag(),
        channel_id: ctx.channel_id().to_string(),
        guild_id: ctx.guild_id().map(|id| id.to_string()),
        message,
        minutes,
        metadata: ReminderOrigin::SlashCommand {
            command_id: command_id(ctx),
        },
    };

    let reminder = match ctx.data().scheduler.create(request).await {
        Ok(reminder) => reminder,
        Err(_) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("❌ {SAVE_FAILED}"))
                    .embed(error_embed(SAVE_FAILED))
                    .ephemeral(true),
            )
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

            return Ok(());
        }
    };

    let embed = reminder_set_embed(
        &reminder,
        format!("I'll remind you about:\n\n*{}*", reminder.message),
    )
    .field("⏱️ Time", format_time_string(minutes), true)
    .field("🕒 Will trigger", relative_time(&reminder), true);

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .ephemeral(true),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// get reminded about this message later.
#[poise::command(context_menu_command = "Remind Me", user_cooldown = 5)]
#[tracing::instrument(skip_all, fields(user_id = %ctx.author().id, message_id = %msg.id))]
pub async fn remind_me(ctx: ApplicationContext<'_>, msg: serenity::Message) -> Result<(), Error> {
    tracing::info!(channel_id = %msg.channel_id, "context menu reminder initiated");

    let modal = poise::execute_modal(ctx, None::<RemindModal>, Some(Duration::from_secs(300)))
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when showing reminder modal"))?;

    let ctx = Context::Application(ctx);

    let Some(RemindModal { time }) = modal else {
        tracing::debug!("reminder modal timed out");
        return Ok(());
    };

    let minutes = match parse_reminder_duration(&time) {
        Ok(minutes) => minutes,
        Err(e) => {
            tracing::warn!(err = %e, "rejected reminder request");
            return reply_ephemeral(ctx, e.user_message()).await;
        }
    };

    let url = msg.link();
    let author = ctx.author();

    let request = ReminderRequest {
        user_id: author.id.to_string(),
        user_tag: author.tag(),
        channel_id: msg.channel_id.to_string(),
        guild_id: msg.guild_id.or(ctx.guild_id()).map(|id| id.to_string()),
        message: context_menu_message(&msg.content, &url),
        minutes,
        metadata: ReminderOrigin::ContextMenu {
            message_id: msg.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            url: url.clone(),
        },
    };

    let reminder = match ctx.data().scheduler.create(request).await {
        Ok(reminder) => reminder,
        Err(_) => return reply_ephemeral(ctx, format!("❌ {SAVE_FAILED}")).await,
    };

    let embed = reminder_set_embed(
        &reminder,
        format!(
            "I'll remind you about this message in {}",
            format_time_string(minutes)
        ),
    )
    .field("Message Link", format!("[Jump to message]({url})"), false)
    .field("Will Trigger", relative_time(&reminder), true);

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .ephemeral(true),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

fn command_id(ctx: Context<'_>) -> Option<String> {
    match ctx {
        poise::Context::Application(ctx) => Some(ctx.interaction.data.id.to_string()),
        poise::Context::Prefix(_) => None,
    }
}

fn relative_time(reminder: &Reminder) -> String {
    format!("<t:{}:R>", reminder.expires_at.unix_timestamp())
}

fn reminder_set_embed(reminder: &Reminder, description: String) -> CreateEmbed {
    CreateEmbed::new()
        .colour(REMINDER_COLOUR)
        .title("⏰ Reminder Set!")
        .description(description)
        .footer(CreateEmbedFooter::new(format!(
            "Reminder ID: {}",
            reminder.short_id()
        )))
        .timestamp(Timestamp::now())
}

/// the stored body for a reminder made from another message: its quoted
/// content, or a link to it when there is no text to quote.
fn context_menu_message(content: &str, url: &str) -> String {
    let sanitized = sanitize_input(content);
    let quoted: String = sanitized.chars().take(MAX_MESSAGE_LENGTH - 2).collect();

    if quoted.trim().is_empty() {
        format!("[View message]({url})")
    } else {
        format!("\"{quoted}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://discord.com/channels/1/2/3";

    #[test]
    fn test_context_menu_message() {
        assert_eq!(context_menu_message("buy \"milk\"", URL), "\"buy milk\"");
        assert_eq!(
            context_menu_message("", URL),
            "[View message](https://discord.com/channels/1/2/3)"
        );
        assert_eq!(
            context_menu_message("<>", URL),
            "[View message](https://discord.com/channels/1/2/3)"
        );
    }

    #[test]
    fn test_context_menu_message_fits_column() {
        let message = context_menu_message(&"x".repeat(5000), URL);

        assert_eq!(message.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(message.starts_with('"') && message.ends_with('"'));
    }
}
