//! Pipeline stages for turning note photos into markup.
//!
//! Each submodule implements exactly one step, so each is testable alone.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ transcribe ──▶ aggregate ──▶ structure (optional)
//! (path/URL)  (1 call/image)  (concat)      (1 call)
//! ```
//!
//! 1. [`input`]      — read local files or download URLs into `UploadedImage`s
//! 2. [`transcribe`] — one remote call per image; failures become `ImageResult.error`
//! 3. [`aggregate`]  — concatenate successes in upload order, `"\n\n"` after each
//! 4. [`structure`]  — ask the model to wrap the aggregate in a compilable document
//! 5. [`postprocess`] — opt-in removal of an outer ``` fence

pub mod aggregate;
pub mod input;
pub mod postprocess;
pub mod structure;
pub mod transcribe;
