//! Adapter that lets any `edgequake_llm` provider act as a [`GenerativeModel`].
//!
//! Image parts become base64 [`ImageData`] attachments and text parts are
//! joined into the user message, so OpenAI, Anthropic, Ollama and the other
//! vision-capable providers receive the same request the Gemini client sends.

use crate::config::PipelineConfig;
use crate::error::{ModelError, Notes2TexError};
use crate::model::{ContentPart, GenerativeModel};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Fallback model when a provider is named without one.
const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

/// [`GenerativeModel`] backed by an `edgequake_llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    timeout_secs: Option<u64>,
}

impl ProviderModel {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        temperature: Option<f32>,
        max_tokens: Option<usize>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let label = format!("{}/{}", provider.name(), provider.model());
        Self {
            provider,
            label,
            temperature,
            max_tokens,
            timeout_secs,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }
}

#[async_trait]
impl GenerativeModel for ProviderModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<String, ModelError> {
        let (text, images) = split_parts(parts);
        let messages = vec![ChatMessage::user_with_images(&text, images)];
        let options = self.options();

        debug!("{}: sending {} message(s)", self.label, messages.len());
        let call = self.provider.chat(&messages, Some(&options));
        let response = match self.timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), call)
                .await
                .map_err(|_| ModelError::Timeout { secs })?,
            None => call.await,
        }
        .map_err(|e| ModelError::Provider(format!("{e}")))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        if response.content.is_empty() {
            return Err(ModelError::EmptyResponse { reason: None });
        }
        Ok(response.content)
    }
}

/// Split content parts into the joined user text and the image attachments.
fn split_parts(parts: &[ContentPart<'_>]) -> (String, Vec<ImageData>) {
    let mut texts = Vec::new();
    let mut images = Vec::new();
    for part in parts {
        match *part {
            ContentPart::Image { media_type, data } => {
                images.push(ImageData::new(STANDARD.encode(data), media_type).with_detail("high"));
            }
            ContentPart::Text(t) => texts.push(t),
        }
    }
    (texts.join("\n\n"), images)
}

/// Resolve an `edgequake_llm` provider for a non-Gemini backend.
///
/// 1. **Named provider + model** (`config.provider_name`) — the factory reads
///    the matching API key (`OPENAI_API_KEY`, …) from the environment.
/// 2. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 3. **`OPENAI_API_KEY`** present → OpenAI.
/// 4. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, Notes2TexError> {
    if let Some(ref name) = config.provider_name {
        if name != "auto" {
            let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
            return create_vision_provider(name, model);
        }
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Notes2TexError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No model provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or use --provider gemini with GEMINI_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Notes2TexError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Notes2TexError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
