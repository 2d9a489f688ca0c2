//! LLM provider implementations

pub mod ollama;
pub mod openai;
pub mod scripted;
pub mod traits;

pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use scripted::ScriptedProvider;
pub use traits::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ProviderError, ProviderResult,
};

use std::sync::Arc;

use crate::config::{Backend, Config, ModelConfig};

pub type SharedProvider = Arc<dyn LLMProvider + Send + Sync>;

/// A provider together with the registry entry it was built from
#[derive(Clone)]
pub struct ModelHandle {
    pub id: String,
    pub config: ModelConfig,
    pub provider: SharedProvider,
}

/// Build the client for one registry entry
pub fn build_provider(id: &str, model: &ModelConfig, config: &Config) -> ProviderResult<SharedProvider> {
    match model.backend {
        Backend::OpenAI => {
            let client = OpenAIClient::from_env(&config.openai.api_key_env)?
                .with_id(id)
                .with_base_url(&config.openai.base_url)
                .with_model(&model.model);
            Ok(Arc::new(client))
        }
        Backend::Ollama => {
            let client = OllamaClient::new(&model.model)
                .with_id(id)
                .with_base_url(&config.ollama.base_url);
            Ok(Arc::new(client))
        }
    }
}

/// Create providers for the enabled models, optionally restricted to `ids`
///
/// Explicitly requested ids must exist in the registry and must build; when
/// no ids are given, models whose backend is unavailable (e.g. a missing API
/// key) are skipped with a warning.
pub fn create_providers(config: &Config, ids: Option<&[String]>) -> ProviderResult<Vec<ModelHandle>> {
    let mut handles = Vec::new();

    match ids {
        Some(ids) => {
            for id in ids {
                let model = config
                    .get_model(id)
                    .ok_or_else(|| ProviderError::Config(format!("Unknown model: {}", id)))?;
                let provider = build_provider(id, model, config)?;
                handles.push(ModelHandle {
                    id: id.clone(),
                    config: model.clone(),
                    provider,
                });
            }
        }
        None => {
            for (id, model) in config.enabled_models() {
                match build_provider(id, model, config) {
                    Ok(provider) => handles.push(ModelHandle {
                        id: id.to_string(),
                        config: model.clone(),
                        provider,
                    }),
                    Err(e) => tracing::warn!("Skipping model {}: {}", id, e),
                }
            }
        }
    }

    Ok(handles)
}

/// OpenAI client used to grade responses
pub fn create_judge(config: &Config) -> ProviderResult<SharedProvider> {
    let client = OpenAIClient::from_env(&config.openai.api_key_env)?
        .with_id("judge")
        .with_base_url(&config.openai.base_url)
        .with_model(&config.openai.judge_model);
    Ok(Arc::new(client))
}
