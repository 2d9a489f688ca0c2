//! Queries every model for every topic and stores the answers

use chrono::Local;
use std::path::{Path, PathBuf};

use crate::dataset::{Dataset, DatasetError, Topic};
use crate::providers::ModelHandle;

use super::executor::Executor;
use super::response::{strip_think, ModelResponse};

/// Format of the run id shared by every file of a run
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Errors that stop a generation run
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No models to query")]
    NoModels,
}

/// A response written to disk
#[derive(Debug, Clone)]
pub struct SavedResponse {
    pub topic: Topic,
    pub model: String,
    pub path: PathBuf,
}

/// A (topic, model) pair that produced nothing
#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub topic: Topic,
    pub model: String,
    pub error: String,
}

/// Outcome of a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub timestamp: String,
    pub saved: Vec<SavedResponse>,
    pub failures: Vec<GenerationFailure>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Current local time as a run id
pub fn run_timestamp() -> String {
    Local::now().format(RUN_TIMESTAMP_FORMAT).to_string()
}

/// Response generator for one parsed log file
pub struct Generator {
    dataset: Dataset,
    log_file: String,
    models: Vec<ModelHandle>,
    executor: Executor,
    responses_dir: PathBuf,
    timestamp: String,
}

impl Generator {
    pub fn new(
        dataset: Dataset,
        log_file: impl Into<String>,
        models: Vec<ModelHandle>,
        executor: Executor,
        responses_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            dataset,
            log_file: log_file.into(),
            models,
            executor,
            responses_dir: responses_dir.as_ref().to_path_buf(),
            timestamp: run_timestamp(),
        }
    }

    /// Override the run id
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Run every topic against every model, in order
    pub async fn run(&self, topics: &[Topic]) -> Result<GenerationReport, RunnerError> {
        if self.models.is_empty() {
            return Err(RunnerError::NoModels);
        }

        let mut report = GenerationReport {
            timestamp: self.timestamp.clone(),
            ..Default::default()
        };

        for &topic in topics {
            self.run_topic(topic, &mut report).await?;
        }

        tracing::info!(
            saved = report.saved.len(),
            failed = report.failures.len(),
            "Generation run {} finished",
            self.timestamp
        );
        Ok(report)
    }

    async fn run_topic(&self, topic: Topic, report: &mut GenerationReport) -> Result<(), RunnerError> {
        let prompt = self.dataset.generate_prompt(&self.log_file, topic)?;
        tracing::info!("Processing {}", topic.title());

        for handle in &self.models {
            tracing::info!("Querying {} for {}", handle.id, topic.title());

            let answer = match self.executor.execute(handle.provider.as_ref(), &prompt).await {
                Ok(response) => response.content,
                Err(e) => {
                    tracing::error!("{} failed on {}: {}", handle.id, topic.title(), e);
                    report.failures.push(GenerationFailure {
                        topic,
                        model: handle.id.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let answer = if handle.config.strip_think {
                strip_think(&answer)
            } else {
                answer.trim().to_string()
            };

            if answer.is_empty() {
                tracing::warn!("{} returned an empty answer for {}", handle.id, topic.title());
                report.failures.push(GenerationFailure {
                    topic,
                    model: handle.id.clone(),
                    error: "empty answer".to_string(),
                });
                continue;
            }

            let response = ModelResponse::new(&handle.id, &self.log_file, topic, answer, &self.timestamp);
            match response.save(&self.responses_dir) {
                Ok(path) => {
                    tracing::info!("Saved {}", path.display());
                    report.saved.push(SavedResponse {
                        topic,
                        model: handle.id.clone(),
                        path,
                    });
                }
                Err(e) => {
                    tracing::error!("Could not save {} response: {}", handle.id, e);
                    report.failures.push(GenerationFailure {
                        topic,
                        model: handle.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
