use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;

/// Layout of `bookmark.timestamp`, always UTC. The fraction is omitted on whole seconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Whole-second layout written by older stores and used for display.
pub const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Last known playback state for one absolute path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bookmark {
    pub path: String,
    pub position: f64,
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

impl Bookmark {
    pub(crate) fn from_row(row: (String, f64, f64, String)) -> Result<Self, AppError> {
        let (path, position, duration, timestamp) = row;

        Ok(Self {
            path,
            position,
            duration,
            timestamp: parse_timestamp(&timestamp)?,
        })
    }
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn display_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(SECONDS_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, AppError> {
    let text = text.trim();
    let parsed = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, SECONDS_FORMAT))?;

    Ok(parsed.and_utc())
}
