use crate::{Context, Error};

/// show all available commands and their usage.
#[poise::command(slash_command)]
#[tracing::instrument(skip_all)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: "Type `/help command` for more info on a command. \
            Right-click a message and pick Apps → Remind Me to be reminded about it.",
        ephemeral: true,
        show_context_menu_commands: true,
        ..Default::default()
    };

    poise::builtins::help(ctx, command.as_deref(), config)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending help"))?;

    Ok(())
}
