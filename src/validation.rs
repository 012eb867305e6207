use std::sync::LazyLock;

pub const MIN_REMINDER_MINUTES: i64 = 1;
pub const MAX_REMINDER_MINUTES: i64 = 24 * 60;
pub const MAX_MESSAGE_LENGTH: usize = 1000;

static TIME_STRING_REGEX: LazyLock<fancy_regex::Regex> = LazyLock::new(|| {
    fancy_regex::Regex::new(r"(?i)^(?:(\d+)h)?(?:(\d+)m)?$|^(?:(\d+)m)?(?:(\d+)h)?$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid time format: {0}")]
    InvalidFormat(String),

    #[error("reminder time must be at least 1 minute")]
    TooShort,

    #[error("reminder time cannot be longer than 1440 minutes, got {0}")]
    TooLong(i64),

    #[error("message must be between 1 and 1000 characters")]
    InvalidMessage,
}

impl ValidationError {
    /// the text shown to the user for this rejection.
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::InvalidFormat(_) => {
                "❌ Invalid time format! Use combinations like: 1h30m, 45m, or 2h"
            }
            ValidationError::TooShort => "❌ Reminder time must be at least 1 minute!",
            ValidationError::TooLong(_) => "❌ Reminder time cannot be longer than 24 hours!",
            ValidationError::InvalidMessage => {
                "❌ Please provide a valid message (1-1000 characters)"
            }
        }
    }
}

/// checks that `time_str` looks like `1h`, `30m`, `1h30m` (or `30m1h`).
pub fn validate_time_string(time_str: &str) -> bool {
    !time_str.is_empty() && matches!(TIME_STRING_REGEX.is_match(time_str), Ok(true))
}

/// parses a duration string into whole minutes.
///
/// the result is `hours * 60 + minutes`. a string with neither group, or one
/// that sums to zero, is rejected. range checks are left to
/// [`validate_reminder_minutes`].
pub fn parse_time_string(time_str: &str) -> Result<i64, ValidationError> {
    let invalid = || ValidationError::InvalidFormat(time_str.to_string());

    if !validate_time_string(time_str) {
        return Err(invalid());
    }

    let captures = TIME_STRING_REGEX
        .captures(time_str)
        .ok()
        .flatten()
        .ok_or_else(invalid)?;

    let group = |idx: usize| -> Result<i64, ValidationError> {
        match captures.get(idx) {
            Some(m) => m.as_str().parse::<i64>().map_err(|_| invalid()),
            None => Ok(0),
        }
    };

    let hours = group(1)? + group(4)?;
    let minutes = group(2)? + group(3)?;

    let total = hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .ok_or_else(invalid)?;

    if total == 0 {
        return Err(invalid());
    }

    Ok(total)
}

pub fn validate_reminder_minutes(minutes: i64) -> Result<i64, ValidationError> {
    if minutes < MIN_REMINDER_MINUTES {
        return Err(ValidationError::TooShort);
    }

    if minutes > MAX_REMINDER_MINUTES {
        return Err(ValidationError::TooLong(minutes));
    }

    Ok(minutes)
}

/// parses and range-checks a reminder duration in one go.
pub fn parse_reminder_duration(time_str: &str) -> Result<i64, ValidationError> {
    validate_reminder_minutes(parse_time_string(time_str.trim())?)
}

/// formats whole minutes as `1h 30m`, `1h` or `45m`.
pub fn format_time_string(minutes: i64) -> String {
    if minutes <= 0 {
        return "0m".to_string();
    }

    let hours = minutes / 60;
    let mins = minutes % 60;

    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// strips `<>"'` and truncates to [`MAX_MESSAGE_LENGTH`] characters.
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .take(MAX_MESSAGE_LENGTH)
        .collect()
}

/// sanitizes a reminder body, rejecting it if nothing is left.
pub fn sanitize_reminder_message(input: &str) -> Result<String, ValidationError> {
    let message = sanitize_input(input);

    if message.trim().is_empty() {
        return Err(ValidationError::InvalidMessage);
    }

    Ok(message)
}
