//! Configuration types for a transcription run.
//!
//! Every run is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. The three historical flows (single-image
//! LaTeX, single-image Markdown, multi-image LaTeX with a structuring pass)
//! are just [`Variant`] presets over the same three knobs: instruction text,
//! [`Multiplicity`], and the `structure` flag.

use crate::error::Notes2TexError;
use crate::model::GenerativeModel;
use crate::progress::ProgressCallback;
use crate::prompts::{LATEX_INSTRUCTION, MARKDOWN_INSTRUCTION, STRUCTURING_INSTRUCTION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default Gemini model used when no model is named.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Configuration for a transcription run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`] (the `latex-multi` preset).
///
/// # Example
/// ```rust
/// use notes2tex::{PipelineConfig, Variant};
///
/// let config = PipelineConfig::builder()
///     .variant(Variant::Markdown)
///     .api_key("my-key")
///     .build()
///     .unwrap();
/// assert!(!config.structure);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Markup the model is asked to produce; decides the export file name
    /// and content type.
    pub format: OutputFormat,

    /// Whether one or several images are accepted per run.
    pub multiplicity: Multiplicity,

    /// Run the document-structuring pass after aggregation.
    pub structure: bool,

    /// Per-image instruction. If None, uses the built-in one for `format`.
    pub instruction: Option<String>,

    /// Structuring instruction. If None, uses [`STRUCTURING_INSTRUCTION`].
    pub structuring_instruction: Option<String>,

    /// What to export when the structuring pass fails. Default: Strict.
    pub structuring_policy: StructuringPolicy,

    /// Model identifier, e.g. "gemini-2.5-flash", "gpt-4.1-mini".
    /// If None, uses [`DEFAULT_GEMINI_MODEL`] for Gemini or the provider default.
    pub model: Option<String>,

    /// Provider name. None or "gemini" selects the built-in Gemini REST client;
    /// anything else ("openai", "anthropic", "ollama", …) goes through
    /// `edgequake_llm`.
    pub provider_name: Option<String>,

    /// Pre-constructed model client. Takes precedence over `provider_name`.
    pub model_client: Option<Arc<dyn GenerativeModel>>,

    /// API key for the Gemini REST client. Never logged.
    pub api_key: Option<String>,

    /// Override for the Gemini API base URL (proxies, regional endpoints).
    pub api_base_url: Option<String>,

    /// Per-call timeout in seconds. None leaves the HTTP client's default.
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Sampling temperature forwarded to `edgequake_llm` providers.
    pub temperature: Option<f32>,

    /// Output-token cap forwarded to `edgequake_llm` providers.
    pub max_tokens: Option<usize>,

    /// Strip a single outer ``` fence from every model response. Default: false.
    pub strip_fences: bool,

    /// Receives per-image and structuring progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut config = Self {
            format: OutputFormat::Latex,
            multiplicity: Multiplicity::Multiple,
            structure: true,
            instruction: None,
            structuring_instruction: None,
            structuring_policy: StructuringPolicy::default(),
            model: None,
            provider_name: None,
            model_client: None,
            api_key: None,
            api_base_url: None,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            temperature: None,
            max_tokens: None,
            strip_fences: false,
            progress_callback: None,
        };
        config.apply_variant(Variant::default());
        config
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("format", &self.format)
            .field("multiplicity", &self.multiplicity)
            .field("structure", &self.structure)
            .field("instruction", &self.instruction.as_ref().map(|_| "<custom>"))
            .field(
                "structuring_instruction",
                &self.structuring_instruction.as_ref().map(|_| "<custom>"),
            )
            .field("structuring_policy", &self.structuring_policy)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field(
                "model_client",
                &self.model_client.as_ref().map(|_| "<dyn GenerativeModel>"),
            )
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("strip_fences", &self.strip_fences)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The per-image instruction in effect for this run.
    pub fn effective_instruction(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or_else(|| self.format.default_instruction())
    }

    /// The structuring instruction in effect for this run.
    pub fn effective_structuring_instruction(&self) -> &str {
        self.structuring_instruction
            .as_deref()
            .unwrap_or(STRUCTURING_INSTRUCTION)
    }

    fn apply_variant(&mut self, variant: Variant) {
        self.format = variant.format();
        self.multiplicity = variant.multiplicity();
        self.structure = variant.structure();
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Apply a preset. Call this first; later setters override its knobs.
    pub fn variant(mut self, variant: Variant) -> Self {
        self.config.apply_variant(variant);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn multiplicity(mut self, m: Multiplicity) -> Self {
        self.config.multiplicity = m;
        self
    }

    pub fn structure(mut self, v: bool) -> Self {
        self.config.structure = v;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn structuring_instruction(mut self, text: impl Into<String>) -> Self {
        self.config.structuring_instruction = Some(text.into());
        self
    }

    pub fn structuring_policy(mut self, policy: StructuringPolicy) -> Self {
        self.config.structuring_policy = policy;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model_client(mut self, client: Arc<dyn GenerativeModel>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = Some(url.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn strip_fences(mut self, v: bool) -> Self {
        self.config.strip_fences = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Notes2TexError> {
        let c = &self.config;
        if c.effective_instruction().trim().is_empty() {
            return Err(Notes2TexError::InvalidConfig(
                "instruction must not be empty".into(),
            ));
        }
        if c.structure && c.format != OutputFormat::Latex {
            return Err(Notes2TexError::InvalidConfig(
                "the structuring pass produces a LaTeX document; disable it for Markdown output"
                    .into(),
            ));
        }
        if c.structure && c.effective_structuring_instruction().trim().is_empty() {
            return Err(Notes2TexError::InvalidConfig(
                "structuring instruction must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(Notes2TexError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(Notes2TexError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Preset combining format, multiplicity and the structuring pass.
///
/// | Variant | Images | Structuring | Export |
/// |---------|--------|-------------|--------|
/// | `Latex` | 1 | no | `.tex` |
/// | `Markdown` | 1 | no | `.md` |
/// | `LatexMulti` | many | yes | `.tex` (default) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// One image → LaTeX fragment.
    Latex,
    /// One image → Markdown.
    Markdown,
    /// Many images → one compilable LaTeX document.
    #[default]
    LatexMulti,
}

impl Variant {
    pub fn format(self) -> OutputFormat {
        match self {
            Variant::Latex | Variant::LatexMulti => OutputFormat::Latex,
            Variant::Markdown => OutputFormat::Markdown,
        }
    }

    pub fn multiplicity(self) -> Multiplicity {
        match self {
            Variant::Latex | Variant::Markdown => Multiplicity::Single,
            Variant::LatexMulti => Multiplicity::Multiple,
        }
    }

    pub fn structure(self) -> bool {
        matches!(self, Variant::LatexMulti)
    }
}

/// Markup produced by the model and declared on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Latex,
    Markdown,
}

impl OutputFormat {
    /// Fixed export file name.
    pub fn file_name(self) -> &'static str {
        match self {
            OutputFormat::Latex => "resultado_latex.tex",
            OutputFormat::Markdown => "resultado_markdown.md",
        }
    }

    /// Declared content type of the exported file.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Latex => "text/latex",
            OutputFormat::Markdown => "text/plain",
        }
    }

    /// Built-in per-image instruction for this format.
    pub fn default_instruction(self) -> &'static str {
        match self {
            OutputFormat::Latex => LATEX_INSTRUCTION,
            OutputFormat::Markdown => MARKDOWN_INSTRUCTION,
        }
    }
}

/// How many images a run accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    Single,
    #[default]
    Multiple,
}

impl Multiplicity {
    /// Upper bound on images per run, if any.
    pub fn max_images(self) -> Option<usize> {
        match self {
            Multiplicity::Single => Some(1),
            Multiplicity::Multiple => None,
        }
    }
}

/// Export behaviour when the structuring pass fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructuringPolicy {
    /// Treat the whole run as failed: no file is exported.
    #[default]
    Strict,
    /// Export the unstructured aggregate instead.
    FallbackToAggregate,
}
