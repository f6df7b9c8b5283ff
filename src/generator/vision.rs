//! VLM-backed generator: send the image to a vision model, get LaTeX back.
//!
//! Prompt text lives in [`crate::prompts`] and response cleanup in
//! [`crate::pipeline::postprocess`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Retry `k` waits `retry_backoff_ms * 2^(k-1)`: with a 1 s
//! base and 3 attempts the waits are 1 s → 2 s. Every attempt is bounded by
//! `api_timeout_secs`.

use crate::config::ConversionConfig;
use crate::error::GenerationError;
use crate::generator::LatexGenerator;
use crate::pipeline::{encode, postprocess};
use crate::prompts::{DEFAULT_SYSTEM_PROMPT, USER_INSTRUCTION};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// [`LatexGenerator`] that calls an edgequake-llm vision provider.
pub struct VisionLatexGenerator {
    provider: Arc<dyn LLMProvider>,
    name: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    max_attempts: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl VisionLatexGenerator {
    /// Wrap `provider`, taking prompt, sampling and retry settings from `config`.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        config: &ConversionConfig,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_attempts: config.max_attempts.max(1),
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    async fn attempt(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let options = self.build_options();
        let call = self.provider.chat(messages, Some(&options));

        let response = timeout(Duration::from_secs(self.api_timeout_secs), call)
            .await
            .map_err(|_| GenerationError::Timeout {
                secs: self.api_timeout_secs,
            })?
            .map_err(|e| GenerationError::Api(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );

        let latex = postprocess::clean_fragment(&response.content);
        if latex.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(latex)
    }
}

/// Backoff before `attempt` (1-based; the first attempt never waits).
pub(crate) fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    if attempt <= 1 {
        0
    } else {
        base_ms.saturating_mul(2u64.saturating_pow(attempt - 2))
    }
}

#[async_trait]
impl LatexGenerator for VisionLatexGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, image_path: &Path) -> Result<String, GenerationError> {
        let start = Instant::now();
        let image = encode::encode_file(image_path)
            .await
            .map_err(|e| GenerationError::ImageRead {
                path: image_path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user_with_images(USER_INSTRUCTION, vec![image]),
        ];

        let mut last_err: Option<GenerationError> = None;

        for attempt in 1..=self.max_attempts {
            let wait = backoff_ms(self.retry_backoff_ms, attempt);
            if wait > 0 {
                warn!(
                    "{}: retry {}/{} after {}ms",
                    image_path.display(),
                    attempt,
                    self.max_attempts,
                    wait
                );
                sleep(Duration::from_millis(wait)).await;
            }

            match self.attempt(&messages).await {
                Ok(latex) => {
                    debug!(
                        "{}: {} bytes of LaTeX in {:?}",
                        image_path.display(),
                        latex.len(),
                        start.elapsed()
                    );
                    return Ok(latex);
                }
                Err(e) => {
                    warn!(
                        "{}: attempt {} failed: {}",
                        image_path.display(),
                        attempt,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(GenerationError::Exhausted {
            attempts: self.max_attempts,
            detail: last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}
