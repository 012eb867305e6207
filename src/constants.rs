use std::sync::LazyLock;

pub mod embeds;
pub mod version;

pub static POISE_VERSION: &str = "0.6.1";
pub static STARTUP_TIME: LazyLock<std::time::SystemTime> =
    LazyLock::new(std::time::SystemTime::now);

/// how many reminders `/reminders list` shows.
pub const REMINDER_LIST_LIMIT: i64 = 10;
