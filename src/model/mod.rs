//! The remote generation call, behind one trait.
//!
//! Everything the pipeline needs from a hosted multimodal model is
//! "content parts in, plain text out". [`GenerativeModel`] captures exactly
//! that, so the pipeline never sees HTTP, auth, or provider quirks, and tests
//! can swap in an in-process stub.
//!
//! Two implementations ship with the crate:
//!
//! * [`gemini::GeminiClient`] — direct REST call to Google's
//!   `generateContent` endpoint (the default backend).
//! * [`provider::ProviderModel`] — adapter over any `edgequake_llm`
//!   provider (OpenAI, Anthropic, Ollama, …).
//!
//! [`resolve_model`] picks one from a [`PipelineConfig`].

pub mod gemini;
pub mod provider;

use crate::config::PipelineConfig;
use crate::error::{ModelError, Notes2TexError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use gemini::GeminiClient;
pub use provider::ProviderModel;

/// One piece of request content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPart<'a> {
    /// Raw image bytes with their media type (e.g. `image/png`).
    Image { media_type: &'a str, data: &'a [u8] },
    /// Plain text (an instruction, or text to transform).
    Text(&'a str),
}

/// A hosted model that turns content parts into plain text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Short provider/model label for logs and error messages.
    fn name(&self) -> &str;

    /// Issue one generation call and return the response text unmodified.
    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<String, ModelError>;
}

/// Resolve the model client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.model_client`) — used as-is.
/// 2. **Gemini** (`provider_name` unset or `"gemini"`) — the built-in REST
///    client; requires `config.api_key`.
/// 3. **Any other provider name** — resolved through `edgequake_llm`
///    (see [`provider::resolve_provider`]).
pub fn resolve_model(config: &PipelineConfig) -> Result<Arc<dyn GenerativeModel>, Notes2TexError> {
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }

    match config.provider_name.as_deref() {
        None | Some("gemini") => {
            let key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| Notes2TexError::ProviderNotConfigured {
                    provider: "gemini".to_string(),
                    hint: "Set GEMINI_API_KEY or pass --api-key.".to_string(),
                })?;
            let model = config.model.as_deref().unwrap_or(crate::config::DEFAULT_GEMINI_MODEL);
            debug!("Using Gemini REST client with model {}", model);
            let client = GeminiClient::new(
                key,
                model,
                config.api_base_url.as_deref(),
                config.api_timeout_secs,
            )?;
            Ok(Arc::new(client))
        }
        Some(_) => {
            let provider = provider::resolve_provider(config)?;
            Ok(Arc::new(ProviderModel::new(
                provider,
                config.temperature,
                config.max_tokens,
                config.api_timeout_secs,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl GenerativeModel for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _parts: &[ContentPart<'_>]) -> Result<String, ModelError> {
            Ok("ok".into())
        }
    }

    #[test]
    fn prebuilt_client_takes_precedence() {
        let config = PipelineConfig::builder()
            .model_client(Arc::new(Fixed))
            .provider_name("openai")
            .build()
            .unwrap();
        let model = resolve_model(&config).unwrap();
        assert_eq!(model.name(), "fixed");
    }

    #[test]
    fn gemini_without_key_is_not_configured() {
        let config = PipelineConfig::default();
        match resolve_model(&config) {
            Err(Notes2TexError::ProviderNotConfigured { provider, .. }) => {
                assert_eq!(provider, "gemini")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn gemini_with_key_resolves() {
        let config = PipelineConfig::builder()
            .api_key("k")
            .model("gemini-2.0-flash")
            .build()
            .unwrap();
        let model = resolve_model(&config).unwrap();
        assert_eq!(model.name(), "gemini/gemini-2.0-flash");
    }
}
