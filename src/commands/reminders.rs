use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter};

use crate::{
    commands::reply_ephemeral,
    constants::{embeds::REMINDER_COLOUR, REMINDER_LIST_LIMIT},
    models::reminder::{short_id, Reminder, ReminderOutcome, ReminderState},
    scheduler::CancelResult,
    store::{ReminderStore, StoreError},
    validation::sanitize_input,
    Context, Error,
};

/// view or cancel your reminders.
#[poise::command(slash_command, subcommand_required, subcommands("list", "cancel"))]
pub async fn reminders(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// list your most recent reminders.
#[poise::command(slash_command, ephemeral)]
#[tracing::instrument(skip_all, fields(user_id = %ctx.author().id))]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();

    let reminders = ctx
        .data()
        .scheduler
        .store()
        .get_by_user(&user_id, REMINDER_LIST_LIMIT)
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching reminders from database"),
        )?;

    if reminders.is_empty() {
        return reply_ephemeral(ctx, "you don't have any reminders. set one with `/remind`!").await;
    }

    let description = reminders
        .iter()
        .enumerate()
        .map(|(idx, reminder)| format!("{}. {}", idx + 1, format_reminder_line(reminder)))
        .collect::<Vec<_>>()
        .join("\n");

    ctx.send(
        poise::CreateReply::default()
            .embed(
                CreateEmbed::new()
                    .colour(REMINDER_COLOUR)
                    .title("⏰ Your Reminders")
                    .description(description)
                    .footer(CreateEmbedFooter::new(
                        "cancel a pending reminder with /reminders cancel <id>",
                    )),
            )
            .ephemeral(true),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// cancel one of your pending reminders.
#[poise::command(slash_command, ephemeral)]
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id))]
pub async fn cancel(
    ctx: Context<'_>,
    #[description = "the reminder id, or the last 6 characters of it"] id: String,
) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let input = sanitize_input(id.trim());

    let scheduler = &ctx.data().scheduler;

    let reminder_id = resolve_reminder_id(scheduler.store(), &user_id, &input)
        .await?
        .unwrap_or_else(|| input.clone());
    let reminder_id = reminder_id.as_str();

    let content = match scheduler.cancel(reminder_id, &user_id).await? {
        CancelResult::Cancelled => format!("✅ cancelled reminder `{}`.", short_id(reminder_id)),
        CancelResult::AlreadyCompleted => {
            "that reminder has already gone off or was cancelled.".to_string()
        }
        CancelResult::NotFound => format!("❌ couldn't find a reminder with id `{input}`."),
    };

    reply_ephemeral(ctx, content).await
}

/// matches `input` against the user's reminders: an exact id first, then the
/// id suffix of a pending reminder.
async fn resolve_reminder_id(
    store: &dyn ReminderStore,
    user_id: &str,
    input: &str,
) -> Result<Option<String>, StoreError> {
    if input.is_empty() {
        return Ok(None);
    }

    if let Some(reminder) = store.get_by_id(input).await? {
        if reminder.user_id == user_id {
            return Ok(Some(reminder.reminder_id));
        }
    }

    Ok(store
        .find_pending_by_suffix(user_id, input)
        .await?
        .map(|r| r.reminder_id))
}

fn state_label(reminder: &Reminder) -> &'static str {
    match reminder.state() {
        ReminderState::Pending => "⏳ pending",
        ReminderState::Cancelled => "🚫 cancelled",
        ReminderState::Completed {
            outcome: Some(ReminderOutcome::Failed),
        } => "⚠️ couldn't deliver",
        ReminderState::Completed {
            outcome: Some(ReminderOutcome::Missed),
        } => "💤 missed",
        ReminderState::Completed { .. } => "✅ delivered",
    }
}

fn format_reminder_line(reminder: &Reminder) -> String {
    let preview: String = reminder.message.chars().take(50).collect();
    let ellipsis = if reminder.message.chars().count() > 50 {
        "…"
    } else {
        ""
    };

    format!(
        "`{}` {} <t:{}:R> - {}{}",
        reminder.short_id(),
        state_label(reminder),
        reminder.expires_at.unix_timestamp(),
        preview,
        ellipsis
    )
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::{
        models::reminder::{ReminderOrigin, ReminderRequest},
        store::memory::MemoryReminderStore,
    };

    fn make_reminder(user_id: &str, millis: i64, message: &str) -> Reminder {
        let created_at = datetime!(2024-05-01 12:00 UTC) + time::Duration::milliseconds(millis);

        ReminderRequest {
            user_id: user_id.into(),
            user_tag: "tester".into(),
            channel_id: "42".into(),
            guild_id: None,
            message: message.into(),
            minutes: 10,
            metadata: ReminderOrigin::SlashCommand { command_id: None },
        }
        .into_new_reminder(created_at)
        .into_pending()
    }

    #[tokio::test]
    async fn test_resolve_reminder_id() {
        let store = MemoryReminderStore::default();

        let pending = make_reminder("1", 0, "a");
        let mut done = make_reminder("1", 1_234, "b");
        done.is_completed = true;
        done.outcome = Some(ReminderOutcome::Delivered);
        let other = make_reminder("2", 5_678, "c");

        store.insert(pending.clone());
        store.insert(done.clone());
        store.insert(other.clone());

        let store = &store;
        let resolve = move |input: String| async move {
            resolve_reminder_id(store, "1", &input).await.unwrap()
        };

        assert_eq!(
            resolve(pending.reminder_id.clone()).await,
            Some(pending.reminder_id.clone())
        );
        assert_eq!(
            resolve(pending.short_id().to_string()).await,
            Some(pending.reminder_id.clone())
        );
        // full ids still resolve for finished reminders, suffixes only for pending ones
        assert_eq!(
            resolve(done.reminder_id.clone()).await,
            Some(done.reminder_id.clone())
        );
        assert_eq!(resolve(done.short_id().to_string()).await, None);
        // other users' reminders never resolve
        assert_eq!(resolve(other.reminder_id.clone()).await, None);
        assert_eq!(resolve(other.short_id().to_string()).await, None);
        assert_eq!(resolve("zzzzzz".to_string()).await, None);
        assert_eq!(resolve(String::new()).await, None);
    }

    #[tokio::test]
    async fn test_resolve_old_pending_reminder_by_suffix() {
        let store = MemoryReminderStore::default();

        let oldest = make_reminder("1", 0, "the old one");
        store.insert(oldest.clone());

        for n in 1..=60 {
            store.insert(make_reminder("1", n * 1_000_003, "newer"));
        }

        assert_eq!(
            resolve_reminder_id(&store, "1", oldest.short_id())
                .await
                .unwrap(),
            Some(oldest.reminder_id.clone())
        );
    }

    #[test]
    fn test_format_reminder_line() {
        let reminder = make_reminder("1", 0, "buy milk");

        assert_eq!(
            format_reminder_line(&reminder),
            "`800000` ⏳ pending <t:1714565400:R> - buy milk"
        );

        let mut long = make_reminder("1", 0, &"a".repeat(60));
        long.is_completed = true;
        long.outcome = Some(ReminderOutcome::Missed);

        let line = format_reminder_line(&long);
        assert!(line.contains("💤 missed"));
        assert!(line.ends_with(&format!("{}…", "a".repeat(50))));
    }
}
