//! Error types for the notes2tex library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`Notes2TexError`] — **Fatal**: the run cannot proceed at all
//!   (missing file, unsupported image type, provider not configured).
//!   Returned as `Err(Notes2TexError)` from the top-level `transcribe*`
//!   functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image failed (empty upload,
//!   remote call error) but the other images are fine. Stored inside
//!   [`crate::output::ImageResult`] so one bad photo never loses the batch.
//!
//! * [`ModelError`] — what a [`crate::model::GenerativeModel`] returns when
//!   the remote call fails. The pipeline folds it into an [`ImageError`] or a
//!   failed structuring outcome.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notes2tex library.
#[derive(Debug, Error)]
pub enum Notes2TexError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No images were supplied; nothing to transcribe.
    #[error("No images were provided.\nPlease provide an image (.png, .jpeg, .jpg) to get started.")]
    NoImages,

    /// A single-image variant received more than one image.
    #[error("This variant accepts at most {max} image(s), got {got}.\nUse --variant latex-multi for several pages.")]
    TooManyImages { max: usize, got: usize },

    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Extension is not one of the accepted upload types.
    #[error("Unsupported image type for '{name}': expected one of png, jpeg, jpg")]
    UnsupportedImageType { name: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("Model provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The structuring pass failed and the export policy is strict.
    #[error("Document structuring failed: {detail}\nNo file was exported. Use --fallback-unstructured to export the raw transcription instead.")]
    StructuringFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the exported file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// Stored in [`crate::output::ImageResult`] when an image produced no text.
/// The run continues with the remaining images.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The upload contained no bytes; no remote call was made.
    #[error("Image {position} ('{name}'): no usable bytes, skipped")]
    Empty { position: usize, name: String },

    /// The remote generation call failed.
    #[error("Image {position} ('{name}'): transcription failed: {detail}")]
    GenerationFailed {
        position: usize,
        name: String,
        detail: String,
    },
}

impl ImageError {
    /// 1-based upload position of the image this error belongs to.
    pub fn position(&self) -> usize {
        match self {
            ImageError::Empty { position, .. } | ImageError::GenerationFailed { position, .. } => {
                *position
            }
        }
    }

    /// `true` when the image was skipped before any remote call.
    pub fn is_skip(&self) -> bool {
        matches!(self, ImageError::Empty { .. })
    }
}

/// Failure of a single remote generation call.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Request never produced an HTTP response (DNS, TLS, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// 401/403 from the service — the key is missing, wrong, or lacks access.
    #[error("authentication rejected by '{provider}' (HTTP {status})")]
    Auth { provider: String, status: u16 },

    /// 429 from the service.
    #[error("rate limit or quota exceeded for '{provider}'")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body could not be decoded as the expected response shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service answered but returned no text (blocked, empty candidate).
    #[error("model returned no text{}", reason_suffix(.reason))]
    EmptyResponse { reason: Option<String> },

    /// Error surfaced by an `edgequake_llm` provider.
    #[error("provider error: {0}")]
    Provider(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" ({r})"),
        None => String::new(),
    }
}
