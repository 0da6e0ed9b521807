use chrono::{DateTime, NaiveDate, Utc};

/// Tick cadence cap. Half a minute leaves room for a slow run before the next tick
/// and still puts one tick inside every deadline minute.
pub(super) const MAX_TICK_SLEEP_MS: u64 = 30_000;

pub(super) fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    raw.trim()
        .parse::<NaiveDate>()
        .map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

pub(super) fn parse_rfc3339_utc(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| format!("invalid timestamp '{raw}', expected RFC 3339"))
}

pub(super) fn parse_tick_sleep_ms(raw: &str) -> std::result::Result<u64, String> {
    let value = raw
        .parse::<u64>()
        .map_err(|_| format!("invalid integer value '{raw}'"))?;
    if value == 0 || value > MAX_TICK_SLEEP_MS {
        return Err(format!(
            "value must be within [1, {MAX_TICK_SLEEP_MS}], got {value}"
        ));
    }
    Ok(value)
}

pub(super) fn parse_min_one_usize(raw: &str) -> std::result::Result<usize, String> {
    let value = raw
        .parse::<usize>()
        .map_err(|_| format!("invalid integer value '{raw}'"))?;
    if value == 0 {
        return Err("value must be >= 1".to_string());
    }
    Ok(value)
}
