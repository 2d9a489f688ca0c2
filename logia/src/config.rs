//! Configuration management for the LogIA pipeline
//!
//! Loads paths, generation settings and the model registry from TOML files
//! and provides runtime access. Secrets stay in the environment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Models queried by the generator, in query order
    #[serde(default = "default_models")]
    pub models: IndexMap<String, ModelConfig>,
}

/// File layout of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_raw_events")]
    pub raw_events: PathBuf,
    #[serde(default = "default_responses_dir")]
    pub responses_dir: PathBuf,
    #[serde(default = "default_ground_truth")]
    pub ground_truth: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Parsed log file (inside `data_dir`) used to build prompts
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            raw_events: default_raw_events(),
            responses_dir: default_responses_dir(),
            ground_truth: default_ground_truth(),
            results_dir: default_results_dir(),
            log_file: default_log_file(),
        }
    }
}

/// Request and retry settings for the response generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Number of parsed records placed in each prompt
    #[serde(default = "default_log_sample_size")]
    pub log_sample_size: usize,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            log_sample_size: default_log_sample_size(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// OpenAI endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Model used to grade responses in LLM-assisted evaluation
    #[serde(default = "default_judge_model")]
    pub judge_model: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_url(),
            api_key_env: default_api_key_env(),
            judge_model: default_judge_model(),
        }
    }
}

/// Ollama endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
        }
    }
}

/// Backend serving a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    OpenAI,
    Ollama,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAI => "openai",
            Backend::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub backend: Backend,
    /// Model name as understood by the backend (e.g. `deepseek-r1:32b`)
    pub model: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Remove `<think>...</think>` reasoning blocks from answers
    #[serde(default)]
    pub strip_think: bool,
}

impl ModelConfig {
    fn new(backend: Backend, model: &str, display_name: &str) -> Self {
        Self {
            backend,
            model: model.to_string(),
            display_name: display_name.to_string(),
            enabled: true,
            strip_think: false,
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_raw_events() -> PathBuf { PathBuf::from("data/real_events.csv") }
fn default_responses_dir() -> PathBuf { PathBuf::from("responses_by_topic") }
fn default_ground_truth() -> PathBuf { PathBuf::from("eval/ground_truth.json") }
fn default_results_dir() -> PathBuf { PathBuf::from("results") }
fn default_log_file() -> String { "parsed_logs_by_unique_rule_description.json".to_string() }
fn default_temperature() -> f32 { 0.1 }
fn default_max_tokens() -> u32 { 2048 }
fn default_log_sample_size() -> usize { 44 }
fn default_retry_count() -> u32 { 2 }
fn default_retry_delay_ms() -> u64 { 1000 }
fn default_max_retry_delay_ms() -> u64 { 30_000 }
fn default_timeout_ms() -> u64 { 300_000 }
fn default_openai_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_judge_model() -> String { "gpt-4".to_string() }
fn default_ollama_url() -> String { "http://localhost:11435".to_string() }

fn default_models() -> IndexMap<String, ModelConfig> {
    let mut models = IndexMap::new();
    models.insert(
        "openai_gpt4".to_string(),
        ModelConfig::new(Backend::OpenAI, "gpt-4", "OpenAI GPT-4"),
    );
    models.insert(
        "phi4".to_string(),
        ModelConfig::new(Backend::Ollama, "phi4", "Phi-4"),
    );
    models.insert(
        "deepseek-r1_32b".to_string(),
        ModelConfig {
            strip_think: true,
            ..ModelConfig::new(Backend::Ollama, "deepseek-r1:32b", "DeepSeek-R1 32B")
        },
    );
    models.insert(
        "llama3.2".to_string(),
        ModelConfig::new(Backend::Ollama, "llama3.2", "Llama 3.2"),
    );
    models
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            generation: GenerationConfig::default(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
            models: default_models(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from an explicit path, or from the default locations
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let config = Self::from_file(path)?;
                tracing::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::load_or_default()),
        }
    }

    /// Load from default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = ["logia.toml", "config/logia.toml"];

        for path in &config_paths {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path);
                    return config;
                }
                Err(e) => tracing::warn!("Ignoring {}: {}", path, e),
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Enabled models in registry order
    pub fn enabled_models(&self) -> impl Iterator<Item = (&str, &ModelConfig)> {
        self.models
            .iter()
            .filter(|(_, m)| m.enabled)
            .map(|(id, m)| (id.as_str(), m))
    }

    /// Get a specific model config
    pub fn get_model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.get(id)
    }

    /// Full path of the parsed log file used for prompts
    pub fn log_file_path(&self) -> PathBuf {
        self.paths.data_dir.join(&self.paths.log_file)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}
