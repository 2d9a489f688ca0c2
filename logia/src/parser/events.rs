//! Raw security-event records and CSV ingestion

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the event export, e.g. `Jun 15, 2025 @ 08:46:14.273`
pub const TIMESTAMP_FORMAT: &str = "%b %d, %Y @ %H:%M:%S%.f";

const COL_TIMESTAMP: &str = "timestamp";
const COL_AGENT: &str = "agent.name";
const COL_LEVEL: &str = "rule.level";
const COL_RULE_ID: &str = "rule.id";
const COL_DESCRIPTION: &str = "rule.description";

/// Error type for log parsing
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row {row}: invalid {column} value {value:?}")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single normalized security event
///
/// Field names follow the dotted column names of the export so the parsed
/// JSON reads the same as the source data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "agent.name")]
    pub agent_name: String,
    #[serde(rename = "rule.level")]
    pub rule_level: i64,
    #[serde(rename = "rule.id")]
    pub rule_id: i64,
    #[serde(rename = "rule.description")]
    pub rule_description: String,
}

/// Parse an export timestamp; `None` when it does not match the layout
///
/// The fractional seconds are mandatory. `%.f` alone would also accept
/// `08:46:14`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let (_, seconds) = raw.rsplit_once(':')?;
    let (_, fraction) = seconds.split_once('.')?;
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Read events from a CSV file
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<LogEvent>, ParseError> {
    let file = std::fs::File::open(path)?;
    parse_events(file)
}

/// Read events from any CSV source with a header row
pub fn parse_events<R: Read>(reader: R) -> Result<Vec<LogEvent>, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ParseError::MissingColumn(name.to_string()))
    };

    let ts_idx = column(COL_TIMESTAMP)?;
    let agent_idx = column(COL_AGENT)?;
    let level_idx = column(COL_LEVEL)?;
    let id_idx = column(COL_RULE_ID)?;
    let desc_idx = column(COL_DESCRIPTION)?;

    let mut events = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        let field = |i: usize| record.get(i).unwrap_or("");

        events.push(LogEvent {
            timestamp: parse_timestamp(field(ts_idx)),
            agent_name: field(agent_idx).to_string(),
            rule_level: parse_integer(field(level_idx), row, COL_LEVEL)?,
            rule_id: parse_integer(field(id_idx), row, COL_RULE_ID)?,
            rule_description: field(desc_idx).to_string(),
        });
    }

    tracing::debug!("Read {} events", events.len());
    Ok(events)
}

/// Integers may be exported as `7` or `7.0`
fn parse_integer(raw: &str, row: usize, column: &'static str) -> Result<i64, ParseError> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.is_finite() => Ok(value as i64),
        _ => Err(ParseError::InvalidField {
            row,
            column,
            value: raw.to_string(),
        }),
    }
}
