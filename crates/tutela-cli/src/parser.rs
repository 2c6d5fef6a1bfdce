use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveTime};

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid date '{raw}'. Use YYYY-MM-DD."))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| anyhow!("Invalid time '{raw}'. Use HH:MM."))
}

/// Splits a comma-separated weekday list into names for the core parser,
/// which drops anything unrecognized.
pub fn parse_days(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
