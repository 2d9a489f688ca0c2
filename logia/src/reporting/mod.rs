//! Results reporting

use chrono::Local;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::{EvaluationMode, JudgeEvaluation, ModelEvaluation, Ranking};
use crate::runner::{ModelResponse, RUN_TIMESTAMP_FORMAT};

/// Evaluation results as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsFile<T> {
    pub mode: String,
    pub timestamp: String,
    pub results: IndexMap<String, T>,
    pub ranking: Ranking,
}

impl<T: Serialize> ResultsFile<T> {
    pub fn new(mode: EvaluationMode, results: IndexMap<String, T>, ranking: Ranking) -> Self {
        Self {
            mode: mode.as_str().to_string(),
            timestamp: Local::now().format(RUN_TIMESTAMP_FORMAT).to_string(),
            results,
            ranking,
        }
    }

    /// `results_<mode>_<timestamp>.json`
    pub fn file_name(&self) -> String {
        format!("results_{}_{}.json", self.mode, self.timestamp)
    }

    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Write evaluation results into `dir` and return the file path
pub fn write_results<T: Serialize>(
    dir: &Path,
    mode: EvaluationMode,
    results: IndexMap<String, T>,
    ranking: Ranking,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let file = ResultsFile::new(mode, results, ranking);
    let path = dir.join(file.file_name());
    file.write_to_file(&path)?;
    tracing::info!("Results saved to {}", path.display());
    Ok(path)
}

/// Ranking section shared by both reports
pub fn render_ranking(ranking: &Ranking) -> String {
    let mut out = format!("\nRanking:\n{:-<50}\n", "");
    for (i, entry) in ranking.ranked.iter().enumerate() {
        out.push_str(&format!("  {}. {} - Score: {:.2}/10\n", i + 1, entry.model, entry.score));
    }
    if let Some(winner) = &ranking.winner {
        match ranking.margin {
            Some(margin) => out.push_str(&format!("\nWinner: {} (margin {:.2})\n", winner, margin)),
            None => out.push_str(&format!("\nWinner: {}\n", winner)),
        }
    }
    out
}

/// Render exact-match results
pub fn render_evaluation_report(results: &IndexMap<String, ModelEvaluation>, ranking: &Ranking) -> String {
    let mut out = String::from("\n=== Ground Truth Evaluation ===\n");

    for (model, evaluation) in results {
        out.push_str(&format!("\nModel: {}\n", model));
        out.push_str(&format!("Topic: {}\n", evaluation.topic));
        out.push_str(&format!(
            "Correct: {}/{} | Score: {}/10\n",
            evaluation.correct, evaluation.total, evaluation.score
        ));
        for (question, detail) in &evaluation.details {
            let verdict = if detail.correct { "Correct" } else { "Incorrect" };
            out.push_str(&format!("\n  Q: {}\n", question.replace('\n', "\n     ")));
            out.push_str(&format!("  {}\n", verdict));
            out.push_str(&format!("    Expected: {}\n", detail.expected));
            out.push_str(&format!("    Model: {}\n", detail.model));
        }
    }

    out.push_str(&render_ranking(ranking));
    out.push_str(&format!("\n{:=<50}\n", ""));
    out
}

/// Render judge results
pub fn render_judge_report(results: &IndexMap<String, JudgeEvaluation>, ranking: &Ranking) -> String {
    let mut out = String::from("\n=== LLM Judge Evaluation ===\n");

    for (model, evaluation) in results {
        out.push_str(&format!("\nEvaluation for {}:\n", model));
        if let Some(reference) = &evaluation.reference {
            out.push_str(&format!("Reference: {}\n", reference));
        }
        match &evaluation.error {
            Some(error) => out.push_str(&format!("Evaluation not available: {}\n", error)),
            None => out.push_str(&format!("{}\n", evaluation.evaluation.trim())),
        }
        match evaluation.score {
            Some(score) => out.push_str(&format!("Extracted score: {}/10\n", score)),
            None => out.push_str("Extracted score: n/a\n"),
        }
    }

    out.push_str(&render_ranking(ranking));
    out.push_str(&format!("\n{:=<50}\n", ""));
    out
}

pub fn print_evaluation_report(results: &IndexMap<String, ModelEvaluation>, ranking: &Ranking) {
    print!("{}", render_evaluation_report(results, ranking));
}

pub fn print_judge_report(results: &IndexMap<String, JudgeEvaluation>, ranking: &Ranking) {
    print!("{}", render_judge_report(results, ranking));
}

/// Human-readable view of a stored response file
pub fn format_response(path: &Path) -> std::io::Result<String> {
    let response = ModelResponse::from_file(path)?;

    let mut out = format!(
        "Model: {}\nAnalysed file: {}\nTopic: {}\n",
        response.model, response.file, response.topic
    );
    if !response.timestamp.is_empty() {
        out.push_str(&format!("Run: {}\n", response.timestamp));
    }

    if response.questions_answers.is_empty() {
        out.push_str(&format!("\n{}\n", response.answer));
    } else {
        for (question, answer) in &response.questions_answers {
            out.push_str(&format!("\nQ: {}\nA: {}\n", question, answer));
        }
    }
    Ok(out)
}
