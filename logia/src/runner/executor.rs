//! Sequential request executor with timeout and retry

use std::time::Duration;
use tokio::time::sleep;

use crate::config::GenerationConfig;
use crate::providers::{CompletionRequest, CompletionResponse, LLMProvider, ProviderError};

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of retries on failure
    pub retry_count: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for ExecutorConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            retry_count: config.retry_count,
            retry_delay_ms: config.retry_delay_ms,
            max_retry_delay_ms: config.max_retry_delay_ms,
            timeout_ms: config.timeout_ms,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Runs one prompt against one provider at a time
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Build the request sent for a prompt
    pub fn request_for(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest::prompt(prompt, self.config.max_tokens)
            .with_temperature(self.config.temperature)
    }

    /// Send a prompt, retrying transient failures
    pub async fn execute(
        &self,
        provider: &dyn LLMProvider,
        prompt: &str,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = self.request_for(prompt);
        self.execute_request(provider, &request).await
    }

    /// Send a prepared request, retrying transient failures
    pub async fn execute_request(
        &self,
        provider: &dyn LLMProvider,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut last_error = None;
        let mut delay = self.config.retry_delay_ms.min(self.config.max_retry_delay_ms);

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                tracing::info!("Retry {} on {}", attempt, provider.name());
                sleep(Duration::from_millis(delay)).await;
                delay = delay.saturating_mul(2).min(self.config.max_retry_delay_ms);
            }

            match self.try_execute(provider, request).await {
                Ok(response) => {
                    tracing::debug!(
                        model = provider.name(),
                        latency_ms = response.latency_ms,
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        "Completion received"
                    );
                    return Ok(response);
                }
                Err(ProviderError::RateLimited { retry_after_ms }) => {
                    if attempt < self.config.retry_count {
                        let wait = retry_after_ms.min(self.config.max_retry_delay_ms);
                        tracing::warn!("Rate limited on {}, waiting {}ms", provider.name(), wait);
                        sleep(Duration::from_millis(wait)).await;
                    }
                    last_error = Some(ProviderError::RateLimited { retry_after_ms });
                }
                Err(e) if !e.is_retryable() => {
                    tracing::error!("Error on {}: {}", provider.name(), e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("Error on {}: {}", provider.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Config("No attempts were made".to_string())))
    }

    /// Try to execute a request (single attempt)
    async fn try_execute(
        &self,
        provider: &dyn LLMProvider,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);

        match tokio::time::timeout(timeout, provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedProvider;

    fn fast_config(retry_count: u32) -> ExecutorConfig {
        ExecutorConfig {
            retry_count,
            retry_delay_ms: 1,
            max_retry_delay_ms: 2,
            timeout_ms: 1_000,
            ..ExecutorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let provider = ScriptedProvider::new("phi4", vec![Ok("answer".to_string())]);
        let executor = Executor::new(fast_config(2));

        let response = executor.execute(&provider, "prompt").await.unwrap();
        assert_eq!(response.content, "answer");
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.prompts(), vec!["prompt".to_string()]);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let provider = ScriptedProvider::new(
            "phi4",
            vec![
                Err(ProviderError::Api { status: 500, message: "boom".into() }),
                Err(ProviderError::RateLimited { retry_after_ms: 1 }),
                Ok("third time".to_string()),
            ],
        );
        let executor = Executor::new(fast_config(2));

        let response = executor.execute(&provider, "p").await.unwrap();
        assert_eq!(response.content, "third time");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let provider = ScriptedProvider::new(
            "phi4",
            vec![
                Err(ProviderError::Parse("a".into())),
                Err(ProviderError::Parse("b".into())),
                Ok("too late".to_string()),
            ],
        );
        let executor = Executor::new(fast_config(1));

        let err = executor.execute(&provider, "p").await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(ref m) if m == "b"));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_huge_retry_delay_is_capped() {
        let provider = ScriptedProvider::new(
            "phi4",
            vec![
                Err(ProviderError::Api { status: 502, message: "a".into() }),
                Err(ProviderError::Api { status: 502, message: "b".into() }),
                Ok("ok".to_string()),
            ],
        );
        let executor = Executor::new(ExecutorConfig {
            retry_delay_ms: u64::MAX,
            ..fast_config(2)
        });

        let response = executor.execute(&provider, "p").await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_on_last_attempt_returns_immediately() {
        let provider = ScriptedProvider::new(
            "openai_gpt4",
            vec![Err(ProviderError::RateLimited { retry_after_ms: 60_000 })],
        );
        let executor = Executor::new(ExecutorConfig {
            max_retry_delay_ms: 60_000,
            ..fast_config(0)
        });

        let result = tokio::time::timeout(Duration::from_secs(5), executor.execute(&provider, "p"))
            .await
            .expect("rate limit on the final attempt should not wait");
        assert!(matches!(result, Err(ProviderError::RateLimited { retry_after_ms: 60_000 })));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_config_error_is_not_retried() {
        let provider = ScriptedProvider::new(
            "openai_gpt4",
            vec![
                Err(ProviderError::Config("bad key".into())),
                Ok("never".to_string()),
            ],
        );
        let executor = Executor::new(fast_config(3));

        assert!(executor.execute(&provider, "p").await.is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let provider = ScriptedProvider::new("slow", vec![Ok("late".to_string())])
            .with_delay(Duration::from_millis(200));
        let executor = Executor::new(ExecutorConfig {
            timeout_ms: 10,
            ..fast_config(0)
        });

        let err = executor.execute(&provider, "p").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { timeout_ms: 10 }));
    }

    #[test]
    fn test_request_uses_generation_settings() {
        let executor = Executor::new(ExecutorConfig {
            temperature: 0.2,
            max_tokens: 99,
            ..ExecutorConfig::default()
        });
        let request = executor.request_for("hello");
        assert_eq!(request.max_tokens, 99);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.flattened_prompt(), "hello");
    }
}
