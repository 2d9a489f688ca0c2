//! Response evaluation framework

pub mod ground_truth;
pub mod judge;
pub mod ranking;

pub use ground_truth::{GroundTruth, GroundTruthEvaluator, ModelEvaluation, QuestionDetail};
pub use judge::{
    build_judge_prompt, extract_score, find_reference_model, JudgeBasis, JudgeEvaluation,
    JudgeEvaluator,
};
pub use ranking::{rank, RankedModel, Ranking};

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::runner::ModelResponse;

/// How stored responses are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Exact comparison with the ground truth
    GroundTruth,
    /// LLM judge compares every model with a reference model
    Reference,
    /// LLM judge compares every model with the ground truth
    JudgeGroundTruth,
}

impl EvaluationMode {
    /// Label used in result file names
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationMode::GroundTruth => "ground_truth",
            EvaluationMode::Reference => "reference",
            EvaluationMode::JudgeGroundTruth => "judge_ground_truth",
        }
    }

    pub fn uses_judge(&self) -> bool {
        !matches!(self, EvaluationMode::GroundTruth)
    }
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation errors
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Ground truth file not found: {0}")]
    MissingGroundTruth(PathBuf),

    #[error("Responses directory not found: {0}")]
    MissingResponses(PathBuf),

    #[error("No reference model response found")]
    NoReference,

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load every stored response in `dir`, keyed by model
///
/// Files are read in name order so that, with timestamped names, the newest
/// run of each model wins. Files that cannot be read, or that have no
/// `model`, are skipped with a warning.
pub fn load_responses(dir: &Path) -> Result<IndexMap<String, ModelResponse>, AnalysisError> {
    if !dir.is_dir() {
        return Err(AnalysisError::MissingResponses(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| AnalysisError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    files.sort();

    let mut responses = IndexMap::new();
    for path in files {
        match ModelResponse::from_file(&path) {
            Ok(response) if !response.model.is_empty() => {
                tracing::debug!("Loaded {} from {}", response.model, path.display());
                responses.insert(response.model.clone(), response);
            }
            Ok(_) => tracing::warn!("Skipping {}: no model", path.display()),
            Err(e) => tracing::warn!("Error loading {}: {}", path.display(), e),
        }
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Topic;

    fn write_response(dir: &Path, model: &str, timestamp: &str, answer: &str) {
        let response = ModelResponse::new(model, "logs.json", Topic::ContentSummary, answer, timestamp);
        std::fs::write(
            dir.join(response.file_name()),
            serde_json::to_string_pretty(&response).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_load_responses_latest_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_response(dir.path(), "phi4", "20250101_100000", "old");
        write_response(dir.path(), "phi4", "20250102_100000", "new");
        write_response(dir.path(), "openai_gpt4", "20250101_100000", "ref");
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("anonymous.json"), r#"{"model":"","file":"f","topic":"t"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let responses = load_responses(dir.path()).unwrap();
        let models: Vec<&str> = responses.keys().map(String::as_str).collect();
        assert_eq!(models, vec!["openai_gpt4", "phi4"]);
        assert_eq!(responses["phi4"].answer, "new");
    }

    #[test]
    fn test_load_responses_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_responses(&missing),
            Err(AnalysisError::MissingResponses(_))
        ));
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(EvaluationMode::GroundTruth.to_string(), "ground_truth");
        assert!(EvaluationMode::Reference.uses_judge());
        assert!(!EvaluationMode::GroundTruth.uses_judge());
    }
}
