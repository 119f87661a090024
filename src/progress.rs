//! Progress-callback trait for per-image transcription events.
//!
//! Inject an [`Arc<dyn TranscriptionProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the uploaded images. The CLI uses it
//! to drive a spinner and to print a warning line naming every image that
//! failed or was skipped.
//!
//! # Example
//!
//! ```rust
//! use notes2tex::{TranscriptionProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl TranscriptionProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, position: usize, total: usize, name: &str, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{position}/{total} {name}: {text_len} chars");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(cb as Arc<dyn TranscriptionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Images are processed sequentially, so calls for
/// one run never overlap, but the trait is `Send + Sync` so a callback can be
/// shared with a runtime that moves the run across threads.
pub trait TranscriptionProgressCallback: Send + Sync {
    /// Called once before the first image, with the number of uploads.
    fn on_run_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before the remote call for an image.
    ///
    /// `position` is 1-based upload order.
    fn on_image_start(&self, position: usize, total: usize, name: &str) {
        let _ = (position, total, name);
    }

    /// Called when an image was transcribed.
    fn on_image_complete(&self, position: usize, total: usize, name: &str, text_len: usize) {
        let _ = (position, total, name, text_len);
    }

    /// Called when the remote call for an image failed.
    fn on_image_error(&self, position: usize, total: usize, name: &str, error: &str) {
        let _ = (position, total, name, error);
    }

    /// Called when an image had no usable bytes and was skipped.
    fn on_image_skipped(&self, position: usize, total: usize, name: &str) {
        let _ = (position, total, name);
    }

    /// Called before the document-structuring call.
    fn on_structuring_start(&self, input_len: usize) {
        let _ = input_len;
    }

    /// Called when the structuring call succeeded.
    fn on_structuring_complete(&self, output_len: usize) {
        let _ = output_len;
    }

    /// Called when the structuring call failed.
    fn on_structuring_error(&self, error: &str) {
        let _ = error;
    }

    /// Called once after every image (and the structuring pass) was attempted.
    fn on_run_complete(&self, total_images: usize, transcribed: usize) {
        let _ = (total_images, transcribed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranscriptionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn TranscriptionProgressCallback>;
