//! Direct REST client for Gemini's `generateContent` endpoint.
//!
//! ## Wire format
//!
//! ```text
//! POST {base}/v1beta/models/{model}:generateContent
//! x-goog-api-key: <key>
//!
//! { "contents": [ { "role": "user",
//!                   "parts": [ { "inlineData": { "mimeType": "image/png", "data": "<b64>" } },
//!                              { "text": "<instruction>" } ] } ],
//!   "generationConfig": { "responseMimeType": "text/plain" } }
//! ```
//!
//! The key travels in a header rather than the `?key=` query string so it
//! never shows up in URLs that reqwest includes in its error messages.

use crate::error::{ModelError, Notes2TexError};
use crate::model::{ContentPart, GenerativeModel};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Bodies longer than this are truncated in error messages.
const MAX_ERROR_BODY: usize = 300;

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    label: String,
    timeout_secs: Option<u64>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    /// Build a client. `base_url` defaults to [`DEFAULT_BASE_URL`].
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, Notes2TexError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| Notes2TexError::ProviderNotConfigured {
            provider: "gemini".to_string(),
            hint: format!("Failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            label: format!("gemini/{model}"),
            timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<String, ModelError> {
        let body = build_request(parts);
        debug!("POST {} ({} parts)", self.endpoint(), parts.len());

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        secs: self.timeout_secs.unwrap_or(0),
                    }
                } else {
                    ModelError::Transport(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            let err = classify_status(status, &text, retry_after);
            warn!("Gemini call failed: {}", err);
            return Err(err);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;
        extract_text(parsed)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    #[serde(rename_all = "camelCase")]
    Inline { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn build_request(parts: &[ContentPart<'_>]) -> GenerateContentRequest {
    let parts = parts
        .iter()
        .map(|p| match *p {
            ContentPart::Image { media_type, data } => Part::Inline {
                inline_data: InlineData {
                    mime_type: media_type.to_string(),
                    data: STANDARD.encode(data),
                },
            },
            ContentPart::Text(text) => Part::Text {
                text: text.to_string(),
            },
        })
        .collect();

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "text/plain",
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
    {
        return Err(ModelError::EmptyResponse {
            reason: Some(reason),
        });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ModelError::EmptyResponse { reason: None });
    };

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if texts.is_empty() {
        return Err(ModelError::EmptyResponse {
            reason: candidate.finish_reason,
        });
    }
    Ok(texts.concat())
}

fn classify_status(status: StatusCode, body: &str, retry_after_secs: Option<u64>) -> ModelError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelError::Auth {
            provider: "gemini".to_string(),
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => ModelError::RateLimited {
            provider: "gemini".to_string(),
            retry_after_secs,
        },
        _ => ModelError::Http {
            status: status.as_u16(),
            body: truncate(body.trim(), MAX_ERROR_BODY),
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &s[..end])
}
