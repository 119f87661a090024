//! Document-structuring pass: wrap aggregated text in a full LaTeX document.
//!
//! The model is asked to add only structural markup (document class,
//! preamble, `document` environment). Nothing checks locally that it kept
//! the content intact; the output is trusted as-is.

use crate::config::PipelineConfig;
use crate::error::ModelError;
use crate::model::{ContentPart, GenerativeModel};
use crate::pipeline::postprocess;
use tracing::{debug, warn};

/// Run the structuring call on `aggregate`.
///
/// Request layout: `[text(aggregate), text(structuring instruction)]`.
pub async fn structure_document(
    model: &dyn GenerativeModel,
    aggregate: &str,
    config: &PipelineConfig,
) -> Result<String, ModelError> {
    let parts = [
        ContentPart::Text(aggregate),
        ContentPart::Text(config.effective_structuring_instruction()),
    ];

    debug!("Structuring {} chars with {}", aggregate.len(), model.name());
    match model.generate(&parts).await {
        Ok(text) if config.strip_fences => Ok(postprocess::strip_outer_fence(&text)),
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("Structuring pass failed: {}", e);
            Err(e)
        }
    }
}
