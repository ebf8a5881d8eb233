//! Vision recognizer: transcribe a page image through a vision LLM.
//!
//! Prompts live in [`crate::prompts`]; this module owns the message layout,
//! the retry loop and the per-call timeout.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Each retry waits
//! `retry_backoff_ms * 2^(attempt-1)`: with 500 ms base and 3 retries the
//! sequence is 500 ms → 1 s → 2 s.

use crate::config::{ExtractionConfig, PageSegmentationMode};
use crate::error::{PageError, Pdf2CandidatesError};
use crate::pipeline::encode::encode_page;
use crate::pipeline::recognize::{RecognizedText, TextRecognizer};
use crate::prompts::{system_prompt, user_prompt};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use image::DynamicImage;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Settings that shape every vision call.
#[derive(Debug, Clone)]
pub struct VisionSettings {
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub api_timeout_secs: u64,
    pub language: Option<String>,
}

impl From<&ExtractionConfig> for VisionSettings {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
            language: config.language.clone(),
        }
    }
}

/// [`TextRecognizer`] that asks a vision LLM to transcribe the page.
pub struct VisionRecognizer {
    provider: Arc<dyn LLMProvider>,
    label: String,
    settings: VisionSettings,
}

impl VisionRecognizer {
    /// `label` names the provider and model in logs and the toolchain report.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        label: impl Into<String>,
        settings: VisionSettings,
    ) -> Self {
        Self {
            provider,
            label: label.into(),
            settings,
        }
    }

    fn messages(&self, psm: PageSegmentationMode, image: ImageData) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&system_prompt(psm)),
            ChatMessage::user_with_images(
                &user_prompt(self.settings.language.as_deref()),
                vec![image],
            ),
        ]
    }
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    fn name(&self) -> &str {
        "vision"
    }

    async fn ensure_available(&self) -> Result<String, Pdf2CandidatesError> {
        // Provider construction already validated the credentials.
        Ok(self.label.clone())
    }

    async fn recognize(
        &self,
        page_num: usize,
        image: DynamicImage,
        psm: PageSegmentationMode,
    ) -> Result<RecognizedText, PageError> {
        let image_data = encode_page(&image).map_err(|e| PageError::RecognitionFailed {
            page: page_num,
            detail: format!("image encoding failed: {e}"),
        })?;
        let messages = self.messages(psm, image_data);
        let options = build_options(&self.settings);
        let limit = Duration::from_secs(self.settings.api_timeout_secs);
        let max_retries = self.settings.max_retries;

        let mut last_err = PageError::RecognitionFailed {
            page: page_num,
            detail: "no attempt made".into(),
        };

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = self.settings.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(limit, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens",
                        page_num, response.prompt_tokens, response.completion_tokens
                    );
                    return Ok(RecognizedText {
                        text: response.content,
                        input_tokens: response.prompt_tokens,
                        output_tokens: response.completion_tokens,
                    });
                }
                Ok(Err(e)) => {
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                    last_err = PageError::RecognitionFailed {
                        page: page_num,
                        detail: e.to_string(),
                    };
                }
                Err(_) => {
                    warn!(
                        "Page {}: attempt {} timed out after {}s",
                        page_num,
                        attempt + 1,
                        limit.as_secs()
                    );
                    last_err = PageError::Timeout {
                        page: page_num,
                        secs: limit.as_secs(),
                    };
                }
            }
        }

        Err(last_err)
    }
}

fn build_options(settings: &VisionSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let config = ExtractionConfig::builder()
            .max_retries(5)
            .language("ita")
            .build()
            .unwrap();
        let settings = VisionSettings::from(&config);
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.language.as_deref(), Some("ita"));

        let opts = build_options(&settings);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(4096));
    }
}
