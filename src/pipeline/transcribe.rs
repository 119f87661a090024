//! Per-image transcription: one upload in, one [`ImageResult`] out.
//!
//! The remote call is made exactly once (no retries). Whatever happens, the
//! function returns an [`ImageResult`] instead of an error so one failing
//! image never aborts the batch; the caller inspects `result.error`.

use crate::config::PipelineConfig;
use crate::error::ImageError;
use crate::model::{ContentPart, GenerativeModel};
use crate::output::ImageResult;
use crate::pipeline::input::UploadedImage;
use crate::pipeline::postprocess;
use std::time::Instant;
use tracing::{debug, warn};

/// Transcribe one uploaded image.
///
/// Request layout: `[image(bytes, media type), text(instruction)]`.
/// An upload with no bytes is skipped without a remote call.
pub async fn transcribe_image(
    model: &dyn GenerativeModel,
    position: usize,
    upload: &UploadedImage,
    config: &PipelineConfig,
) -> ImageResult {
    let mut result = ImageResult {
        position,
        name: upload.name.clone(),
        media_type: upload.media_type.clone(),
        text: String::new(),
        duration_ms: 0,
        error: None,
    };

    if upload.is_empty() {
        warn!("Image {} ('{}'): no usable bytes, skipping", position, upload.name);
        result.error = Some(ImageError::Empty {
            position,
            name: upload.name.clone(),
        });
        return result;
    }

    let parts = [
        ContentPart::Image {
            media_type: &upload.media_type,
            data: &upload.bytes,
        },
        ContentPart::Text(config.effective_instruction()),
    ];

    let start = Instant::now();
    let outcome = model.generate(&parts).await;
    result.duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(text) => {
            debug!(
                "Image {} ('{}'): {} chars in {}ms",
                position,
                upload.name,
                text.len(),
                result.duration_ms
            );
            result.text = if config.strip_fences {
                postprocess::strip_outer_fence(&text)
            } else {
                text
            };
        }
        Err(e) => {
            warn!("Image {} ('{}'): {} failed: {}", position, upload.name, model.name(), e);
            result.error = Some(ImageError::GenerationFailed {
                position,
                name: upload.name.clone(),
                detail: e.to_string(),
            });
        }
    }

    result
}
