//! # notes2tex
//!
//! Transcribe photos of handwritten notes into LaTeX or Markdown with a
//! hosted multimodal model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images (png / jpeg / jpg)
//!  │
//!  ├─ 1. Input       read local files or download URLs
//!  ├─ 2. Transcribe  one model call per image, in upload order
//!  ├─ 3. Aggregate   successful texts joined, "\n\n" after each
//!  ├─ 4. Structure   optional second call: wrap in a compilable document
//!  └─ 5. Export      fixed file name + content type, body = final text
//! ```
//!
//! A failing image never aborts the batch: its error is kept in
//! [`ImageResult::error`] and the other images are still transcribed.
//! A failing structuring pass is kept in [`RunOutput::structured`]; the
//! [`StructuringPolicy`] decides whether export then fails or falls back to
//! the raw aggregate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notes2tex::{transcribe_files, PipelineConfig, Variant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .variant(Variant::LatexMulti)
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let inputs = vec!["page1.jpg".to_string(), "page2.jpg".to_string()];
//!     let output = transcribe_files(&inputs, &config).await?;
//!     let artifact = output.export(config.structuring_policy)?;
//!     artifact.write_to_dir(".")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Variants
//!
//! | Variant | Images | Structuring | Export |
//! |---------|--------|-------------|--------|
//! | `latex` | 1 | no | `resultado_latex.tex` (`text/latex`) |
//! | `markdown` | 1 | no | `resultado_markdown.md` (`text/plain`) |
//! | `latex-multi` | many | yes | `resultado_latex.tex` (`text/latex`) |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notes2tex` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Multiplicity, OutputFormat, PipelineConfig, PipelineConfigBuilder, StructuringPolicy, Variant,
};
pub use error::{ImageError, ModelError, Notes2TexError};
pub use export::ExportArtifact;
pub use model::{ContentPart, GenerativeModel};
pub use output::{ImageResult, RunOutput, RunStats, StructuredOutcome};
pub use pipeline::input::UploadedImage;
pub use progress::{NoopProgressCallback, ProgressCallback, TranscriptionProgressCallback};
pub use run::{transcribe, transcribe_files, transcribe_files_sync, transcribe_to_file, transcribe_with};
pub use stream::{stream_uploads, transcribe_stream};
