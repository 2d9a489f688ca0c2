//! Parsed log access and prompt assembly

pub mod topics;

pub use topics::{parse_topic_list, OneShotExample, Topic};

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Opening instruction shared by every prompt
const PREAMBLE: &str = "Answer the questions strictly following the templates as precisely as possible.\n";

/// Default number of records placed in a prompt
pub const DEFAULT_SAMPLE_SIZE: usize = 44;

/// Error type for dataset access
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Data directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path} line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory of parsed JSON-lines log files
#[derive(Debug, Clone)]
pub struct Dataset {
    data_dir: PathBuf,
    sample_size: usize,
}

impl Dataset {
    /// Open a data directory; it must already exist
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.is_dir() {
            return Err(DatasetError::MissingDirectory(data_dir));
        }
        Ok(Self {
            data_dir,
            sample_size: DEFAULT_SAMPLE_SIZE,
        })
    }

    /// Set how many records go into each prompt
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// All `*.json` files in the data directory, sorted by name
    pub fn json_files(&self) -> Result<Vec<PathBuf>, DatasetError> {
        let entries = std::fs::read_dir(&self.data_dir).map_err(|source| DatasetError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Load a JSON-lines file from the data directory
    pub fn load_logs(&self, file_name: &str) -> Result<Vec<Value>, DatasetError> {
        let path = self.data_dir.join(file_name);
        let file = std::fs::File::open(&path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| DatasetError::Io {
                path: path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| DatasetError::Json {
                path: path.clone(),
                line: idx + 1,
                source,
            })?;
            records.push(record);
        }

        tracing::debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Build the prompt for a topic from the given parsed log file
    pub fn generate_prompt(&self, file_name: &str, topic: Topic) -> Result<String, DatasetError> {
        let mut logs = self.load_logs(file_name)?;
        logs.truncate(self.sample_size);
        Ok(build_prompt(&logs, topic))
    }
}

/// Assemble a prompt from log records: example, real logs, style, questions
pub fn build_prompt(logs: &[Value], topic: Topic) -> String {
    let mut prompt = String::from(PREAMBLE);

    if let Some(example) = topic.one_shot() {
        prompt.push_str("\n### Example:\n");
        prompt.push_str(&pretty(&example.logs));
        prompt.push('\n');
        prompt.push_str(example.answer);
        prompt.push('\n');
    }

    prompt.push_str("\n### Real logs:\n");
    prompt.push_str(&pretty(&Value::Array(logs.to_vec())));
    prompt.push_str("\n\n");
    prompt.push_str(topic.response_style());
    prompt.push_str(&topic.questions().join("\n"));
    prompt
}

fn pretty(value: &Value) -> String {
    // Value serialization cannot fail: keys are always strings
    serde_json::to_string_pretty(value).unwrap_or_default()
}
