//! Result types produced by a transcription run.

use crate::config::{OutputFormat, StructuringPolicy};
use crate::error::{ImageError, Notes2TexError};
use crate::export::ExportArtifact;
use serde::{Deserialize, Serialize};

/// Outcome for one uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// 1-based upload position.
    pub position: usize,
    /// Display name of the upload.
    pub name: String,
    /// Media type sent to the model.
    pub media_type: String,
    /// Text returned by the model; empty when `error` is set.
    pub text: String,
    /// Wall-clock time of the remote call in milliseconds.
    pub duration_ms: u64,
    /// Set when the image was skipped or its call failed.
    pub error: Option<ImageError>,
}

impl ImageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of the document-structuring pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StructuredOutcome {
    /// The model returned a structured document.
    Structured { text: String },
    /// The call failed; `detail` is the error message.
    Failed { detail: String },
}

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_images: usize,
    pub transcribed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
    pub transcription_duration_ms: u64,
    pub structuring_duration_ms: u64,
}

/// Everything one run produced.
///
/// The raw `aggregate` and the `structured` outcome are kept side by side so
/// the caller decides what a structuring failure means; see
/// [`RunOutput::final_text`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Markup the images were transcribed into.
    pub format: OutputFormat,
    /// Per-image results in upload order.
    pub images: Vec<ImageResult>,
    /// Successful texts concatenated in upload order, each followed by a blank line.
    pub aggregate: String,
    /// Structuring outcome; None when the pass was disabled or not attempted.
    pub structured: Option<StructuredOutcome>,
    pub stats: RunStats,
}

impl RunOutput {
    /// The text to show and export under `policy`.
    ///
    /// * No structuring outcome → the aggregate.
    /// * Structured → the structured text.
    /// * Failed + `Strict` → [`Notes2TexError::StructuringFailed`].
    /// * Failed + `FallbackToAggregate` → the aggregate.
    pub fn final_text(&self, policy: StructuringPolicy) -> Result<&str, Notes2TexError> {
        match (&self.structured, policy) {
            (None, _) => Ok(&self.aggregate),
            (Some(StructuredOutcome::Structured { text }), _) => Ok(text),
            (Some(StructuredOutcome::Failed { .. }), StructuringPolicy::FallbackToAggregate) => {
                Ok(&self.aggregate)
            }
            (Some(StructuredOutcome::Failed { detail }), StructuringPolicy::Strict) => {
                Err(Notes2TexError::StructuringFailed {
                    detail: detail.clone(),
                })
            }
        }
    }

    /// Package [`Self::final_text`] as a downloadable artifact.
    pub fn export(&self, policy: StructuringPolicy) -> Result<ExportArtifact, Notes2TexError> {
        let text = self.final_text(policy)?;
        Ok(ExportArtifact::new(self.format, text))
    }

    /// Errors of every image that produced no text, in upload order.
    pub fn image_errors(&self) -> impl Iterator<Item = &ImageError> {
        self.images.iter().filter_map(|r| r.error.as_ref())
    }
}
