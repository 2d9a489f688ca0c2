//! Response generation: prompt every model for every topic

pub mod executor;
pub mod generator;
pub mod response;

pub use executor::{Executor, ExecutorConfig};
pub use generator::{
    run_timestamp, GenerationFailure, GenerationReport, Generator, RunnerError, SavedResponse,
    RUN_TIMESTAMP_FORMAT,
};
pub use response::{strip_think, structure_answer, ModelResponse, NO_ANSWER};
