//! Streaming API: yield each image's result as soon as its call returns.
//!
//! Images are still processed one at a time in upload order, so items arrive
//! in upload order. The stream covers transcription only; callers that want
//! the aggregate or the structuring pass should use [`crate::run::transcribe`].

use crate::config::PipelineConfig;
use crate::error::{ImageError, Notes2TexError};
use crate::model::{resolve_model, GenerativeModel};
use crate::output::ImageResult;
use crate::pipeline::input::{self, UploadedImage};
use crate::run::{check_input_count, run_one};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-image results.
pub type ImageStream = Pin<Box<dyn Stream<Item = Result<ImageResult, ImageError>> + Send>>;

/// Load `inputs` and stream their transcriptions.
///
/// # Returns
/// - `Ok(ImageStream)` — one item per input, in upload order
/// - `Err(Notes2TexError)` — fatal error (no inputs, unreadable file, no provider)
///
/// # Example
/// ```rust,no_run
/// use notes2tex::{transcribe_stream, PipelineConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::builder().api_key("…").build()?;
/// let inputs = vec!["page1.jpg".to_string(), "page2.jpg".to_string()];
/// let mut stream = transcribe_stream(&inputs, &config).await?;
/// while let Some(item) = stream.next().await {
///     match item {
///         Ok(r) => println!("{}: {} chars", r.name, r.text.len()),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn transcribe_stream(
    inputs: &[String],
    config: &PipelineConfig,
) -> Result<ImageStream, Notes2TexError> {
    check_input_count(inputs.len(), config)?;
    let model = resolve_model(config)?;
    let uploads = input::load_uploads(inputs, config.download_timeout_secs).await?;
    info!("Starting streaming transcription of {} image(s)", uploads.len());
    Ok(stream_uploads(model, uploads, config))
}

/// Stream transcriptions of already-loaded uploads with an explicit model.
///
/// Fires `on_run_start` when the stream is built and `on_run_complete` once
/// the last item has been produced, the same events [`crate::run::transcribe_with`] fires.
pub fn stream_uploads(
    model: Arc<dyn GenerativeModel>,
    uploads: Vec<UploadedImage>,
    config: &PipelineConfig,
) -> ImageStream {
    let total = uploads.len();
    let config = config.clone();
    let transcribed = Arc::new(AtomicUsize::new(0));

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
        if total == 0 {
            cb.on_run_complete(0, 0);
        }
    }

    let s = stream::iter(uploads.into_iter().enumerate()).then(move |(idx, upload)| {
        let model = Arc::clone(&model);
        let cfg = config.clone();
        let transcribed = Arc::clone(&transcribed);
        async move {
            let position = idx + 1;
            let mut result = run_one(model.as_ref(), position, total, &upload, &cfg).await;
            if result.is_success() {
                transcribed.fetch_add(1, Ordering::SeqCst);
            }
            if position == total {
                if let Some(ref cb) = cfg.progress_callback {
                    cb.on_run_complete(total, transcribed.load(Ordering::SeqCst));
                }
            }
            match result.error.take() {
                None => Ok(result),
                Some(err) => Err(err),
            }
        }
    });

    Box::pin(s)
}
