//! Eager (whole-batch) transcription entry points.
//!
//! These wait for every image and the optional structuring pass, then
//! return a [`RunOutput`]. Use [`crate::stream::transcribe_stream`] to get
//! per-image results as they arrive instead.

use crate::config::PipelineConfig;
use crate::error::Notes2TexError;
use crate::model::{resolve_model, GenerativeModel};
use crate::output::{ImageResult, RunOutput, RunStats, StructuredOutcome};
use crate::pipeline::input::{self, UploadedImage};
use crate::pipeline::{aggregate, structure, transcribe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Transcribe files or URLs.
///
/// Inputs are loaded first (fatal on a missing file or unsupported type),
/// then handed to [`transcribe`].
pub async fn transcribe_files(
    inputs: &[String],
    config: &PipelineConfig,
) -> Result<RunOutput, Notes2TexError> {
    check_input_count(inputs.len(), config)?;
    let uploads = input::load_uploads(inputs, config.download_timeout_secs).await?;
    transcribe(&uploads, config).await
}

/// Transcribe in-memory uploads with the model resolved from `config`.
///
/// # Errors
/// Returns `Err(Notes2TexError)` only for fatal errors:
/// - no uploads ([`Notes2TexError::NoImages`]); no remote call is made
/// - more uploads than the variant accepts
/// - no model provider could be configured
///
/// Per-image failures are reported in [`RunOutput::images`]; a failed
/// structuring pass is reported in [`RunOutput::structured`].
pub async fn transcribe(
    uploads: &[UploadedImage],
    config: &PipelineConfig,
) -> Result<RunOutput, Notes2TexError> {
    check_input_count(uploads.len(), config)?;
    let model = resolve_model(config)?;
    transcribe_with(model.as_ref(), uploads, config).await
}

/// Transcribe with an explicit model client.
pub async fn transcribe_with(
    model: &dyn GenerativeModel,
    uploads: &[UploadedImage],
    config: &PipelineConfig,
) -> Result<RunOutput, Notes2TexError> {
    check_input_count(uploads.len(), config)?;
    let total_start = Instant::now();
    let total = uploads.len();
    info!("Transcribing {} image(s) with {}", total, model.name());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    // ── Step 1: One remote call per image, in upload order ───────────────
    let llm_start = Instant::now();
    let mut images: Vec<ImageResult> = Vec::with_capacity(total);
    for (idx, upload) in uploads.iter().enumerate() {
        let position = idx + 1;
        let result = run_one(model, position, total, upload, config).await;
        images.push(result);
    }
    let transcription_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 2: Aggregate ────────────────────────────────────────────────
    let aggregate = aggregate::aggregate(&images);
    let transcribed = images.iter().filter(|r| r.is_success()).count();
    let skipped = images
        .iter()
        .filter(|r| r.error.as_ref().is_some_and(|e| e.is_skip()))
        .count();
    let failed = total - transcribed - skipped;

    // ── Step 3: Optional structuring pass ────────────────────────────────
    let structuring_start = Instant::now();
    let structured = if !config.structure {
        None
    } else if transcribed == 0 {
        warn!("No image produced text; skipping the structuring pass");
        None
    } else {
        Some(run_structuring(model, &aggregate, config).await)
    };
    let structuring_duration_ms = if structured.is_some() {
        structuring_start.elapsed().as_millis() as u64
    } else {
        0
    };

    let stats = RunStats {
        total_images: total,
        transcribed,
        failed,
        skipped,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        transcription_duration_ms,
        structuring_duration_ms,
    };

    info!(
        "Run complete: {}/{} images transcribed ({} failed, {} skipped), {}ms total",
        transcribed, total, failed, skipped, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, transcribed);
    }

    Ok(RunOutput {
        format: config.format,
        images,
        aggregate,
        structured,
        stats,
    })
}

/// Transcribe, then write the export artifact to `output_path`.
///
/// Honours `config.structuring_policy`: under `Strict`, a failed structuring
/// pass returns [`Notes2TexError::StructuringFailed`] and nothing is written.
pub async fn transcribe_to_file(
    inputs: &[String],
    output_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunOutput, Notes2TexError> {
    let output = transcribe_files(inputs, config).await?;
    output
        .export(config.structuring_policy)?
        .write_to(output_path)?;
    Ok(output)
}

/// Synchronous wrapper around [`transcribe_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn transcribe_files_sync(
    inputs: &[String],
    config: &PipelineConfig,
) -> Result<RunOutput, Notes2TexError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Notes2TexError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(transcribe_files(inputs, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

pub(crate) fn check_input_count(n: usize, config: &PipelineConfig) -> Result<(), Notes2TexError> {
    if n == 0 {
        return Err(Notes2TexError::NoImages);
    }
    if let Some(max) = config.multiplicity.max_images() {
        if n > max {
            return Err(Notes2TexError::TooManyImages { max, got: n });
        }
    }
    Ok(())
}

/// Transcribe one image and fire the matching progress events.
pub(crate) async fn run_one(
    model: &dyn GenerativeModel,
    position: usize,
    total: usize,
    upload: &UploadedImage,
    config: &PipelineConfig,
) -> ImageResult {
    let cb = config.progress_callback.as_ref();
    if !upload.is_empty() {
        if let Some(cb) = cb {
            cb.on_image_start(position, total, &upload.name);
        }
    }

    let result = transcribe::transcribe_image(model, position, upload, config).await;

    if let Some(cb) = cb {
        match &result.error {
            None => cb.on_image_complete(position, total, &result.name, result.text.len()),
            Some(e) if e.is_skip() => cb.on_image_skipped(position, total, &result.name),
            Some(e) => cb.on_image_error(position, total, &result.name, &e.to_string()),
        }
    }
    result
}

async fn run_structuring(
    model: &dyn GenerativeModel,
    aggregate: &str,
    config: &PipelineConfig,
) -> StructuredOutcome {
    if let Some(ref cb) = config.progress_callback {
        cb.on_structuring_start(aggregate.len());
    }

    match structure::structure_document(model, aggregate, config).await {
        Ok(text) => {
            debug!("Structured document: {} chars", text.len());
            if let Some(ref cb) = config.progress_callback {
                cb.on_structuring_complete(text.len());
            }
            StructuredOutcome::Structured { text }
        }
        Err(e) => {
            let detail = e.to_string();
            if let Some(ref cb) = config.progress_callback {
                cb.on_structuring_error(&detail);
            }
            StructuredOutcome::Failed { detail }
        }
    }
}
