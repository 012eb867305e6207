use std::sync::Arc;

use constants::STARTUP_TIME;
use scheduler::ReminderScheduler;

#[derive(Clone)]
struct Data {
    scheduler: Arc<ReminderScheduler>,
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;
type ApplicationContext<'a> = poise::ApplicationContext<'a, Data, Error>;

mod commands;
mod constants;
mod init;
mod models;
mod notifier;
mod scheduler;
mod store;
mod telemetry;
mod validation;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(err = ?error, command = %ctx.command().qualified_name, "an error occurred when executing command");

            let reply = poise::CreateReply::default()
                .embed(commands::error_embed(
                    "There was an error executing this command!",
                ))
                .ephemeral(true);

            if let Err(e) = ctx.send(reply).await {
                tracing::error!(err = ?e, "an error occurred when sending error reply");
            }
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            let secs = remaining_cooldown.as_secs_f64().ceil() as u64;

            let reply = poise::CreateReply::default()
                .content(format!(
                    "Please wait {} second(s) before using this command again.",
                    secs.max(1)
                ))
                .ephemeral(true);

            if let Err(e) = ctx.send(reply).await {
                tracing::error!(err = ?e, "an error occurred when sending cooldown reply");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!(err = ?e, "an error occurred when handling framework error");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _ = &*STARTUP_TIME;

    let mut client = init::init().await?;

    client
        .start()
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when running the client"))?;

    Ok(())
}
