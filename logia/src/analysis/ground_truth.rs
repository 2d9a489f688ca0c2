//! Exact scoring against expected answers

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::AnalysisError;
use crate::runner::ModelResponse;

/// Expected answers: topic title to question to answer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroundTruth {
    topics: IndexMap<String, IndexMap<String, String>>,
}

impl GroundTruth {
    pub fn from_file(path: &Path) -> Result<Self, AnalysisError> {
        if !path.exists() {
            return Err(AnalysisError::MissingGroundTruth(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| AnalysisError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Add or replace an expected answer
    pub fn insert(&mut self, topic: &str, question: &str, answer: &str) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(question.to_string(), answer.to_string());
    }

    /// Expected answers for a topic, if any
    pub fn expected(&self, topic: &str) -> Option<&IndexMap<String, String>> {
        self.topics.get(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}

/// Outcome for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub correct: bool,
    pub expected: String,
    pub model: String,
}

/// Exact-match score of one model's response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub topic: String,
    pub file: String,
    /// Correct answers on a 0-10 scale, rounded to two decimals
    pub score: f64,
    pub correct: usize,
    pub total: usize,
    pub details: IndexMap<String, QuestionDetail>,
}

/// Scores responses by case-insensitive comparison with the ground truth
pub struct GroundTruthEvaluator<'a> {
    ground_truth: &'a GroundTruth,
}

impl<'a> GroundTruthEvaluator<'a> {
    pub fn new(ground_truth: &'a GroundTruth) -> Self {
        Self { ground_truth }
    }

    pub fn evaluate(&self, response: &ModelResponse) -> ModelEvaluation {
        let mut details = IndexMap::new();
        let mut correct = 0;

        if let Some(expected) = self.ground_truth.expected(&response.topic) {
            for (question, expected_answer) in expected {
                let model_answer = response.answer_for(question).trim();
                let is_correct = answers_match(model_answer, expected_answer);
                if is_correct {
                    correct += 1;
                }
                details.insert(
                    question.clone(),
                    QuestionDetail {
                        correct: is_correct,
                        expected: expected_answer.clone(),
                        model: model_answer.to_string(),
                    },
                );
            }
        } else {
            tracing::warn!("No expected answers for {}", response.topic);
        }

        let total = details.len();
        ModelEvaluation {
            topic: response.topic.clone(),
            file: response.file.clone(),
            score: score_out_of_ten(correct, total),
            correct,
            total,
            details,
        }
    }

    /// Evaluate every loaded response, keyed by model
    pub fn evaluate_all(
        &self,
        responses: &IndexMap<String, ModelResponse>,
    ) -> IndexMap<String, ModelEvaluation> {
        responses
            .iter()
            .map(|(model, response)| {
                tracing::info!("Evaluating model: {}", model);
                (model.clone(), self.evaluate(response))
            })
            .collect()
    }
}

fn answers_match(model: &str, expected: &str) -> bool {
    model.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// `correct / total` on a 0-10 scale with two decimals, 0 when empty
pub fn score_out_of_ten(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let score = correct as f64 / total as f64 * 10.0;
    (score * 100.0).round() / 100.0
}
