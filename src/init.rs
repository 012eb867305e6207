use std::{str::FromStr, sync::Arc};

use anyhow::Context as _;
use poise::serenity_prelude::{self as serenity, Client, ClientBuilder};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::Instrument;

use crate::{
    commands, on_error,
    notifier::DiscordNotifier,
    scheduler::{ReminderScheduler, SchedulerConfig},
    store::PgReminderStore,
    telemetry, Data,
};

/// reads `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {value:?}")),
        Err(_) => Ok(default),
    }
}

async fn init_database() -> anyhow::Result<PgPool> {
    let db_url = std::env::var("DATABASE_URL").context("missing DATABASE_URL")?;
    let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10u32)?;

    tracing::info!("initializing database connection...");
    let opts = PgConnectOptions::from_str(&db_url).context("invalid DATABASE_URL")?;
    let db = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await?;

    tracing::info!("running migrations...");
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("finished running migrations!");

    Ok(db)
}

fn init_scheduler_config() -> anyhow::Result<SchedulerConfig> {
    let defaults = SchedulerConfig::default();

    let config = SchedulerConfig {
        retention_days: env_or("REMINDER_RETENTION_DAYS", defaults.retention_days)?,
        sweep_interval: std::time::Duration::from_secs(env_or(
            "REMINDER_SWEEP_INTERVAL_SECS",
            defaults.sweep_interval.as_secs(),
        )?),
        missed_grace: time::Duration::minutes(env_or(
            "REMINDER_MISSED_GRACE_MINUTES",
            defaults.missed_grace.whole_minutes(),
        )?),
    };

    anyhow::ensure!(
        !config.sweep_interval.is_zero(),
        "REMINDER_SWEEP_INTERVAL_SECS must be greater than zero"
    );

    tracing::info!(
        retention_days = config.retention_days,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        missed_grace_minutes = config.missed_grace.whole_minutes(),
        "loaded reminder settings"
    );

    Ok(config)
}

async fn init_discord_client(
    token: &str,
    db: PgPool,
    config: SchedulerConfig,
) -> anyhow::Result<Client> {
    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::remind::remind(),
                commands::remind::remind_me(),
                commands::reminders::reminders(),
                commands::eight_ball::eight_ball(),
                commands::help::help(),
                commands::status::status(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands)
                    .await
                    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when registering commands"))?;

                let scheduler = ReminderScheduler::new(
                    Arc::new(PgReminderStore::new(db)),
                    Arc::new(DiscordNotifier::new(ctx.http.clone())),
                    config,
                );

                scheduler.rehydrate().await?;
                scheduler.spawn_sweeper();
                tracing::info!("initialized reminder scheduler!");

                Ok(Data { scheduler })
            }.in_current_span())
        })
        .build();

    let client = ClientBuilder::new(token, intents)
        .framework(framework)
        .activity(serenity::ActivityData {
            name: "/remind | /help".into(),
            kind: serenity::ActivityType::Listening,
            state: None,
            url: None,
        })
        .await?;

    Ok(client)
}

pub async fn init() -> anyhow::Result<Client> {
    telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialize telemetry")?;

    tracing::info!("initializing... please wait warmly.");

    let token = std::env::var("DISCORD_TOKEN").context("missing DISCORD_TOKEN")?;

    let config = init_scheduler_config()?;
    let db = init_database().await?;

    let client = init_discord_client(&token, db, config).await?;

    tracing::info!("finished initializing!");
    Ok(client)
}
