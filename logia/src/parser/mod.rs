//! Log parser: raw event CSV to structured JSON-lines views

pub mod events;

pub use events::{parse_events, parse_timestamp, read_events, LogEvent, ParseError};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Minimum rule level kept in the filtered view
pub const MIN_FILTER_LEVEL: i64 = 7;

pub const FILTERED_FILE: &str = "parsed_logs_filtered.json";
pub const ALL_FILE: &str = "parsed_logs_all.json";
pub const BY_DESCRIPTION_FILE: &str = "parsed_logs_by_unique_rule_description.json";

/// Latest event for a rule description together with its occurrence count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: LogEvent,
    pub count: u64,
}

/// The three views produced from a batch of events
#[derive(Debug, Clone, Default)]
pub struct ParsedLogs {
    /// Events at or above [`MIN_FILTER_LEVEL`], newest first
    pub filtered: Vec<LogEvent>,
    /// Every event ordered by rule id
    pub all: Vec<LogEvent>,
    /// One entry per description, most severe first
    pub by_description: Vec<EventSummary>,
}

impl ParsedLogs {
    pub fn from_events(events: Vec<LogEvent>) -> Self {
        let mut newest = events.clone();
        newest.sort_by(newest_first);

        let filtered: Vec<LogEvent> = newest
            .iter()
            .filter(|e| e.rule_level >= MIN_FILTER_LEVEL)
            .cloned()
            .collect();

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for event in &events {
            *counts.entry(event.rule_description.as_str()).or_insert(0) += 1;
        }

        // First hit in recency order is the latest event for the description.
        let mut latest: IndexMap<&str, &LogEvent> = IndexMap::new();
        for event in &newest {
            latest.entry(event.rule_description.as_str()).or_insert(event);
        }

        let mut by_description: Vec<EventSummary> = latest
            .into_iter()
            .map(|(description, event)| EventSummary {
                event: event.clone(),
                count: counts.get(description).copied().unwrap_or(0),
            })
            .collect();
        by_description.sort_by(|a, b| b.event.rule_level.cmp(&a.event.rule_level));

        let mut all = events;
        all.sort_by_key(|e| e.rule_id);

        Self {
            filtered,
            all,
            by_description,
        }
    }

    /// Total number of events across all descriptions
    pub fn total_events(&self) -> usize {
        self.all.len()
    }
}

/// Descending timestamp order; events without a timestamp sort last
fn newest_first(a: &LogEvent, b: &LogEvent) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Output locations for the parsed views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutputs {
    pub filtered: PathBuf,
    pub all: PathBuf,
    pub by_description: PathBuf,
}

impl ParsedOutputs {
    /// Standard file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            filtered: dir.join(FILTERED_FILE),
            all: dir.join(ALL_FILE),
            by_description: dir.join(BY_DESCRIPTION_FILE),
        }
    }
}

/// Counts reported after a parse run
#[derive(Debug, Clone)]
pub struct ParseSummary {
    pub events: usize,
    pub filtered: usize,
    pub unique_descriptions: usize,
    pub outputs: ParsedOutputs,
}

/// Parse a CSV export and write the three JSON-lines views
pub fn parse_logs(input: impl AsRef<Path>, outputs: &ParsedOutputs) -> Result<ParseSummary, ParseError> {
    let input = input.as_ref();
    tracing::info!("Parsing events from {}", input.display());

    let events = read_events(input)?;
    let parsed = ParsedLogs::from_events(events);

    write_json_lines(&outputs.filtered, &parsed.filtered)?;
    write_json_lines(&outputs.all, &parsed.all)?;
    write_json_lines(&outputs.by_description, &parsed.by_description)?;

    tracing::info!(
        events = parsed.total_events(),
        filtered = parsed.filtered.len(),
        unique = parsed.by_description.len(),
        "Parsed logs written"
    );

    Ok(ParseSummary {
        events: parsed.total_events(),
        filtered: parsed.filtered.len(),
        unique_descriptions: parsed.by_description.len(),
        outputs: outputs.clone(),
    })
}

/// Write one JSON object per line
pub fn write_json_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<(), ParseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
