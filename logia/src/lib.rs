//! LogIA: benchmarking LLMs on security event log analysis
//!
//! The pipeline has three stages:
//!
//! - **Parse**: turn a CSV export of security events into JSON-lines views
//!   (high-severity events, all events, one record per rule description).
//! - **Generate**: ask every configured model a fixed set of questions per
//!   topic about a sample of the parsed logs and store structured answers.
//! - **Evaluate**: score stored answers against a ground truth, exactly or
//!   with an LLM acting as judge, and rank the models.
//!
//! # Example
//!
//! ```no_run
//! use logia::{
//!     config::Config,
//!     dataset::{Dataset, Topic},
//!     providers::create_providers,
//!     runner::{Executor, ExecutorConfig, Generator},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default();
//!     let models = create_providers(&config, None)?;
//!
//!     let dataset = Dataset::new(&config.paths.data_dir)?
//!         .with_sample_size(config.generation.log_sample_size);
//!     let executor = Executor::new(ExecutorConfig::from(&config.generation));
//!
//!     let generator = Generator::new(
//!         dataset,
//!         &config.paths.log_file,
//!         models,
//!         executor,
//!         &config.paths.responses_dir,
//!     );
//!     let report = generator.run(&Topic::all()).await?;
//!     println!("{} responses saved", report.saved.len());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod parser;
pub mod providers;
pub mod reporting;
pub mod runner;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{
        load_responses, rank, EvaluationMode, GroundTruth, GroundTruthEvaluator, JudgeEvaluation,
        JudgeEvaluator, ModelEvaluation, Ranking,
    };
    pub use crate::config::{Backend, Config, ModelConfig};
    pub use crate::dataset::{Dataset, Topic};
    pub use crate::parser::{parse_logs, LogEvent, ParsedLogs, ParsedOutputs};
    pub use crate::providers::{
        create_judge, create_providers, CompletionRequest, CompletionResponse, LLMProvider,
        ModelHandle, ProviderError, ProviderResult,
    };
    pub use crate::reporting::{print_evaluation_report, print_judge_report, write_results};
    pub use crate::runner::{Executor, ExecutorConfig, Generator, ModelResponse};
}
