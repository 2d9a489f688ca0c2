//! OpenAI chat-completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::traits::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ProviderError, ProviderResult,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// OpenAI API client bound to one configured model
pub struct OpenAIClient {
    id: String,
    api_key: String,
    base_url: String,
    http_client: Client,
    default_model: String,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        Self {
            id: "openai".to_string(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: Client::new(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from the named environment variable
    pub fn from_env(var: &str) -> ProviderResult<Self> {
        let api_key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::Config(format!("{} not set", var)))?;
        Ok(Self::new(api_key))
    }

    /// Set the identifier reported by `name()`
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

/// Reasoning and GPT-5.x models take `max_completion_tokens` and some reject temperature
fn uses_completion_tokens(model: &str) -> bool {
    model.starts_with("o1") || model.starts_with("o3") || model.starts_with("gpt-5")
}

fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("o1") || model.starts_with("o3")
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl From<&Message> for OpenAIMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.clone(),
            content: Some(msg.content.clone()),
        }
    }
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
    model: String,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

fn build_request(request: &CompletionRequest, default_model: &str) -> OpenAIRequest {
    let mut messages: Vec<OpenAIMessage> = Vec::new();
    if let Some(system) = &request.system_prompt {
        messages.push(OpenAIMessage::from(&Message::system(system.clone())));
    }
    messages.extend(request.messages.iter().map(OpenAIMessage::from));

    let model = request
        .model
        .clone()
        .unwrap_or_else(|| default_model.to_string());

    if uses_completion_tokens(&model) {
        let temperature = if is_reasoning_model(&model) {
            None
        } else {
            request.temperature
        };
        OpenAIRequest {
            model,
            messages,
            max_tokens: None,
            max_completion_tokens: Some(request.max_tokens),
            temperature,
        }
    } else {
        OpenAIRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            max_completion_tokens: None,
            temperature: request.temperature,
        }
    }
}

/// Map a non-success HTTP status and body to a provider error
fn classify_error(status: u16, body: &str, retry_after_secs: Option<u64>) -> ProviderError {
    let parsed = serde_json::from_str::<OpenAIError>(body).ok();

    if status == 429 {
        // 429 covers both throttling and exhausted quota; only throttling is worth retrying.
        if let Some(error) = &parsed {
            let error_type = error.error.error_type.as_deref().unwrap_or("");
            if error_type == "insufficient_quota"
                || error.error.message.contains("exceeded your current quota")
            {
                return ProviderError::Config(format!(
                    "OpenAI quota exceeded: {}",
                    error.error.message
                ));
            }
        }
        return ProviderError::RateLimited {
            retry_after_ms: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS) * 1000,
        };
    }

    let message = match parsed {
        Some(error) => error.error.message,
        None => format!("HTTP {}: {}", status, body),
    };

    if status == 401 || status == 403 {
        return ProviderError::Config(format!("OpenAI auth error ({}): {}", status, message));
    }

    ProviderError::Api { status, message }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    fn name(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let start = Instant::now();
        let body = build_request(request, &self.default_model);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            let error = classify_error(status.as_u16(), &text, retry_after);
            tracing::debug!("OpenAI request failed for {}: {}", self.id, error);
            return Err(error);
        }

        let api_response: OpenAIResponse = response.json().await?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

        let (input_tokens, output_tokens) = api_response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model,
            input_tokens,
            output_tokens,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms,
        })
    }

    async fn health_check(&self) -> ProviderResult<bool> {
        let request = CompletionRequest::prompt("Hi", 10);

        match self.complete(&request).await {
            Ok(_) => Ok(true),
            Err(ProviderError::RateLimited { .. }) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}
