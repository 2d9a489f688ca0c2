//! Stored model responses

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::dataset::Topic;

/// Placeholder for questions the model left unanswered
pub const NO_ANSWER: &str = "(No answer)";

/// One model's answers to one topic, as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model: String,
    /// Parsed log file the prompt was built from
    pub file: String,
    /// Topic title
    pub topic: String,
    /// Question text to the matching answer line
    #[serde(default)]
    pub questions_answers: IndexMap<String, String>,
    /// Full answer text after post-processing
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub timestamp: String,
}

impl ModelResponse {
    /// Structure a raw answer against the topic's questions
    pub fn new(
        model: impl Into<String>,
        file: impl Into<String>,
        topic: Topic,
        answer: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        let answer = answer.into();
        Self {
            model: model.into(),
            file: file.into(),
            topic: topic.title().to_string(),
            questions_answers: structure_answer(topic.questions(), &answer),
            answer,
            timestamp: timestamp.into(),
        }
    }

    /// Topic this response belongs to, if the title is known
    pub fn topic_kind(&self) -> Option<Topic> {
        Topic::from_title(&self.topic)
    }

    /// Answer for a question, empty when missing
    pub fn answer_for(&self, question: &str) -> &str {
        self.questions_answers
            .get(question)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// File name used when saving: `response_<model>_<timestamp>.json`
    pub fn file_name(&self) -> String {
        format!("response_{}_{}.json", self.model, self.timestamp)
    }

    /// Write under `<responses_dir>/<topic slug>/`
    pub fn save(&self, responses_dir: &Path) -> std::io::Result<PathBuf> {
        let topic_dir = match self.topic_kind() {
            Some(topic) => responses_dir.join(topic.slug()),
            None => responses_dir.join(self.topic.replace(' ', "_").to_lowercase()),
        };
        std::fs::create_dir_all(&topic_dir)?;

        let path = topic_dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Map the i-th non-blank answer line to the i-th question
pub fn structure_answer(questions: &[&str], text: &str) -> IndexMap<String, String> {
    let lines: Vec<&str> = text
        .trim()
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_matches(|c| c == '-' || c == ' ').trim())
        .collect();

    questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let answer = lines.get(i).copied().unwrap_or(NO_ANSWER);
            (question.to_string(), answer.to_string())
        })
        .collect()
}

fn think_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("static pattern"))
}

/// Remove `<think>...</think>` reasoning blocks and trim
pub fn strip_think(text: &str) -> String {
    think_pattern().replace_all(text, "").trim().to_string()
}
