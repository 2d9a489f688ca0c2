//! Ollama client for locally served models
//!
//! Uses `/api/generate` in streaming mode. The body arrives as
//! newline-delimited JSON objects whose `response` fragments are joined
//! into the final answer; the last object (`"done": true`) carries token
//! counts.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::traits::{CompletionRequest, CompletionResponse, LLMProvider, ProviderError, ProviderResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11435";

/// Ollama HTTP client bound to one configured model
pub struct OllamaClient {
    id: String,
    base_url: String,
    http_client: Client,
    default_model: String,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            id: model.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: Client::new(),
            default_model: model,
        }
    }

    /// Set the identifier reported by `name()`
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// One line of the streamed body
#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

/// Accumulates a streamed generation line by line
#[derive(Debug, Default)]
struct StreamState {
    text: String,
    model: Option<String>,
    done_reason: Option<String>,
    input_tokens: u32,
    output_tokens: u32,
    error: Option<String>,
}

impl StreamState {
    fn consume_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let chunk: GenerateChunk = match serde_json::from_str(line) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("Skipping undecodable stream line ({}): {}", e, line);
                return;
            }
        };

        if let Some(error) = chunk.error {
            self.error = Some(error);
            return;
        }
        if let Some(fragment) = chunk.response {
            self.text.push_str(&fragment);
        }
        if self.model.is_none() {
            self.model = chunk.model;
        }
        if chunk.done {
            self.done_reason = chunk.done_reason.or_else(|| Some("stop".to_string()));
            self.input_tokens = chunk.prompt_eval_count.unwrap_or(0);
            self.output_tokens = chunk.eval_count.unwrap_or(0);
        }
    }

    /// Feed raw bytes, consuming every complete line and keeping the remainder
    fn consume_bytes(&mut self, pending: &mut Vec<u8>, bytes: &[u8]) {
        pending.extend_from_slice(bytes);
        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            self.consume_line(&String::from_utf8_lossy(&line));
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    fn name(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let start = Instant::now();
        let model = request.model.as_deref().unwrap_or(&self.default_model);

        let body = GenerateRequest {
            model,
            prompt: request.flattened_prompt(),
            system: request.system_prompt.as_deref(),
            stream: true,
            options: request.temperature.map(|temperature| GenerateOptions { temperature }),
        };

        let mut response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let mut state = StreamState::default();
        let mut pending = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            state.consume_bytes(&mut pending, &chunk);
        }
        if !pending.is_empty() {
            state.consume_line(&String::from_utf8_lossy(&pending));
        }

        if let Some(error) = state.error {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error,
            });
        }

        Ok(CompletionResponse {
            content: state.text.trim().to_string(),
            model: state.model.unwrap_or_else(|| model.to_string()),
            input_tokens: state.input_tokens,
            output_tokens: state.output_tokens,
            finish_reason: state.done_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn health_check(&self) -> ProviderResult<bool> {
        let response = self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_concatenates_fragments() {
        let mut state = StreamState::default();
        for line in [
            r#"{"model":"phi4","response":"There are ","done":false}"#,
            r#"{"model":"phi4","response":"8 events.","done":false}"#,
            r#"{"model":"phi4","response":"","done":true,"done_reason":"stop","prompt_eval_count":120,"eval_count":9}"#,
        ] {
            state.consume_line(line);
        }
        assert_eq!(state.text, "There are 8 events.");
        assert_eq!(state.model.as_deref(), Some("phi4"));
        assert_eq!(state.done_reason.as_deref(), Some("stop"));
        assert_eq!((state.input_tokens, state.output_tokens), (120, 9));
        assert!(state.error.is_none());
    }

    #[test]
    fn test_stream_skips_garbage_lines() {
        let mut state = StreamState::default();
        state.consume_line("not json");
        state.consume_line("");
        state.consume_line(r#"{"response":"ok"}"#);
        assert_eq!(state.text, "ok");
    }

    #[test]
    fn test_stream_error_line() {
        let mut state = StreamState::default();
        state.consume_line(r#"{"error":"model 'phi5' not found"}"#);
        assert_eq!(state.error.as_deref(), Some("model 'phi5' not found"));
    }

    #[test]
    fn test_bytes_split_across_chunks() {
        let mut state = StreamState::default();
        let mut pending = Vec::new();
        state.consume_bytes(&mut pending, br#"{"response":"Hel"#);
        assert!(state.text.is_empty());
        state.consume_bytes(&mut pending, b"lo\"}\n{\"response\":\" world\"}\n{\"resp");
        assert_eq!(state.text, "Hello world");
        assert_eq!(pending, br#"{"resp"#.to_vec());
    }

    #[test]
    fn test_request_body() {
        let request = CompletionRequest::prompt("logs here", 64).with_temperature(0.1);
        let body = GenerateRequest {
            model: "deepseek-r1:32b",
            prompt: request.flattened_prompt(),
            system: None,
            stream: true,
            options: request.temperature.map(|temperature| GenerateOptions { temperature }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "deepseek-r1:32b");
        assert_eq!(json["stream"], true);
        assert!(json.get("system").is_none());
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_client_naming() {
        let client = OllamaClient::new("llama3.2")
            .with_id("llama3.2-local")
            .with_base_url("http://gpu-box:11434/");
        assert_eq!(client.name(), "llama3.2-local");
        assert_eq!(client.default_model(), "llama3.2");
        assert_eq!(client.base_url(), "http://gpu-box:11434");
    }
}
