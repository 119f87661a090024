//! Export: package the final text as a single downloadable file.
//!
//! The artifact carries a fixed file name and a declared content type taken
//! from the [`OutputFormat`]; its body is the final text byte for byte. No
//! transformation happens here.

use crate::config::OutputFormat;
use crate::error::Notes2TexError;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// A file ready to be saved or served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl ExportArtifact {
    pub fn new(format: OutputFormat, body: impl Into<String>) -> Self {
        Self {
            file_name: format.file_name(),
            content_type: format.content_type(),
            body: body.into(),
        }
    }

    /// Write into `dir` under the fixed file name. Returns the written path.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Notes2TexError> {
        let path = dir.as_ref().join(self.file_name);
        self.write_to(&path)?;
        Ok(path)
    }

    /// Write to an explicit path.
    ///
    /// The body goes to a temp file in the destination directory which is
    /// then renamed over `path`, so a crash never leaves a half-written file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), Notes2TexError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| Notes2TexError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(write_err)?;

        // NamedTempFile defaults to 0600; exports get the usual umask-derived
        // mode, or keep the mode of the file they replace.
        let mut builder = tempfile::Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(&parent).map_err(write_err)?;
        if let Ok(existing) = std::fs::metadata(path) {
            tmp.as_file()
                .set_permissions(existing.permissions())
                .map_err(write_err)?;
        }
        tmp.write_all(self.body.as_bytes()).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        info!(
            "Exported {} ({}, {} bytes)",
            path.display(),
            self.content_type,
            self.body.len()
        );
        Ok(())
    }
}
