use std::time::UNIX_EPOCH;

use crate::{
    commands::get_bot_avatar,
    constants::{embeds::REMINDER_COLOUR, version::get_version, POISE_VERSION, STARTUP_TIME},
    Context, Error,
};
use poise::serenity_prelude as serenity;

/// get the bot's status.
#[poise::command(slash_command)]
#[tracing::instrument(skip_all)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let armed = ctx.data().scheduler.active_timers();
    let started = STARTUP_TIME
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    ctx.send(poise::CreateReply::default().embed(
        serenity::CreateEmbed::new()
        .colour(REMINDER_COLOUR)
        .field(
            "about the bot",
            "a reminder bot for Discord: set one with `/remind`, or right-click a message and pick \"Remind Me\". written using the [poise](https://github.com/serenity-rs/poise) framework.",
            false
        )
        .field("version", get_version(), false)
        .field("rust", format!("[{0}](https://releases.rs/docs/{0})", rustc_version_runtime::version()), true)
        .field("poise", format!("[{0}](https://docs.rs/crate/poise/{0})", POISE_VERSION), true)
        .field("reminders armed", armed.to_string(), true)
        .field("uptime", format!("<t:{started}:R>"), true)
        .thumbnail(get_bot_avatar(ctx))
    ))
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}
