use poise::serenity_prelude::{CreateEmbed, Timestamp};

use crate::{constants::embeds::ERROR_COLOUR, Context, Error};

pub mod eight_ball;
pub mod help;
pub mod remind;
pub mod reminders;
pub mod status;

pub(crate) fn get_bot_avatar(ctx: Context<'_>) -> String {
    ctx.cache().current_user().avatar_url().unwrap_or_default()
}

pub(crate) fn error_embed(description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .colour(ERROR_COLOUR)
        .title("❌ Error")
        .description(description)
        .timestamp(Timestamp::now())
}

/// sends an ephemeral plain-text reply.
pub(crate) async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}
