//! Offline provider that replays a fixed script of outcomes
//!
//! Test stub: each `complete` call pops the next scripted result and records
//! the prompt it was given. No CLI path builds it.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::traits::{CompletionRequest, CompletionResponse, LLMProvider, ProviderError, ProviderResult};

pub struct ScriptedProvider {
    id: String,
    script: Mutex<VecDeque<ProviderResult<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(id: impl Into<String>, script: Vec<ProviderResult<String>>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Provider that answers every call with the same text
    pub fn repeating(id: impl Into<String>, answer: &str, times: usize) -> Self {
        Self::new(id, (0..times).map(|_| Ok(answer.to_string())).collect())
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.flattened_prompt());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| Err(ProviderError::Config(format!("{}: script exhausted", self.id))));

        next.map(|content| CompletionResponse {
            output_tokens: content.split_whitespace().count() as u32,
            content,
            model: self.id.clone(),
            input_tokens: 0,
            finish_reason: "stop".to_string(),
            latency_ms: 0,
        })
    }

    async fn health_check(&self) -> ProviderResult<bool> {
        Ok(true)
    }
}
