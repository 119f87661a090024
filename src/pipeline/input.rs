//! Input collection: turn user-supplied paths or URLs into [`UploadedImage`]s.
//!
//! Only the upload extensions the remote service is known to accept are let
//! through (`png`, `jpeg`, `jpg`). The declared media type comes from the
//! extension; when the bytes are a recognisable PNG/JPEG that disagrees with
//! the extension, the sniffed type wins so the model is not sent a mislabelled
//! payload. Empty files are *not* rejected here: the pipeline skips them with
//! a warning, the same way it treats any other item that yields no bytes.

use crate::error::Notes2TexError;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upload extensions accepted by the tool.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg"];

/// One image payload, owned by the run and dropped after it.
#[derive(Clone)]
pub struct UploadedImage {
    /// Display name (file name or last URL segment).
    pub name: String,
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedImage")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl UploadedImage {
    /// Wrap in-memory bytes, deriving the media type from `name`'s extension.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Notes2TexError> {
        let name = name.into();
        let declared = media_type_for_name(&name)
            .ok_or_else(|| Notes2TexError::UnsupportedImageType { name: name.clone() })?;
        let media_type = reconcile_media_type(&name, declared, &bytes);
        Ok(Self {
            name,
            media_type: media_type.to_string(),
            bytes,
        })
    }

    /// Wrap in-memory bytes with an explicit media type. No checks are made.
    pub fn with_media_type(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// `true` when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load every input in order. Fails on the first input that cannot be read.
pub async fn load_uploads(
    inputs: &[String],
    download_timeout_secs: u64,
) -> Result<Vec<UploadedImage>, Notes2TexError> {
    let mut uploads = Vec::with_capacity(inputs.len());
    for input in inputs {
        uploads.push(load_upload(input, download_timeout_secs).await?);
    }
    Ok(uploads)
}

/// Resolve one path or URL to an [`UploadedImage`].
pub async fn load_upload(
    input: &str,
    download_timeout_secs: u64,
) -> Result<UploadedImage, Notes2TexError> {
    if is_url(input) {
        download_url(input, download_timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

async fn load_local(path: &Path) -> Result<UploadedImage, Notes2TexError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if media_type_for_name(&name).is_none() {
        return Err(Notes2TexError::UnsupportedImageType { name });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Notes2TexError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Notes2TexError::FileNotFound {
            path: PathBuf::from(path),
        },
    })?;

    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    UploadedImage::from_bytes(name, bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedImage, Notes2TexError> {
    info!("Downloading image from: {}", url);

    let name = filename_from_url(url);
    if media_type_for_name(&name).is_none() {
        return Err(Notes2TexError::UnsupportedImageType { name });
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Notes2TexError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Notes2TexError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Notes2TexError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Notes2TexError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Notes2TexError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} ({} bytes)", name, bytes.len());
    UploadedImage::from_bytes(name, bytes.to_vec())
}

/// Last non-empty URL path segment, or `"downloaded.png"`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.png".to_string()
}

/// Media type for an accepted extension, case-insensitive.
pub fn media_type_for_name(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    match ImageFormat::from_extension(&ext)? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        _ => None,
    }
}

fn reconcile_media_type(name: &str, declared: &'static str, bytes: &[u8]) -> &'static str {
    let sniffed = match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        _ => return declared,
    };
    if sniffed != declared {
        warn!(
            "'{}' is named as {} but its content is {}; sending as {}",
            name, declared, sniffed, sniffed
        );
    }
    sniffed
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/page.png"));
        assert!(is_url("http://example.com/page.png"));
        assert!(!is_url("/tmp/page.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn accepted_extensions_map_to_media_types() {
        assert_eq!(media_type_for_name("a.png"), Some("image/png"));
        assert_eq!(media_type_for_name("a.JPG"), Some("image/jpeg"));
        assert_eq!(media_type_for_name("a.jpeg"), Some("image/jpeg"));
        assert_eq!(media_type_for_name("a.gif"), None);
        assert_eq!(media_type_for_name("a.pdf"), None);
        assert_eq!(media_type_for_name("noext"), None);
    }

    #[test]
    fn sniffed_type_overrides_wrong_extension() {
        let up = UploadedImage::from_bytes("photo.png", JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(up.media_type, "image/jpeg");
        let up = UploadedImage::from_bytes("photo.jpg", PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(up.media_type, "image/png");
    }

    #[test]
    fn unrecognised_bytes_keep_declared_type() {
        let up = UploadedImage::from_bytes("page.jpg", b"not really an image".to_vec()).unwrap();
        assert_eq!(up.media_type, "image/jpeg");
    }

    #[test]
    fn empty_bytes_are_accepted_but_flagged() {
        let up = UploadedImage::from_bytes("blank.png", Vec::new()).unwrap();
        assert!(up.is_empty());
        assert_eq!(up.media_type, "image/png");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = UploadedImage::from_bytes("notes.pdf", b"%PDF".to_vec()).unwrap_err();
        assert!(matches!(err, Notes2TexError::UnsupportedImageType { .. }));
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.io/a/b/page1.jpg"), "page1.jpg");
        assert_eq!(filename_from_url("https://x.io/"), "downloaded.png");
    }

    #[test]
    fn debug_hides_bytes() {
        let up = UploadedImage::with_media_type("a.png", "image/png", vec![0; 2048]);
        let dbg = format!("{up:?}");
        assert!(dbg.contains("<2048 bytes>"));
    }

    #[tokio::test]
    async fn load_local_reads_file_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page1.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        let up = load_upload(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(up.name, "page1.png");
        assert_eq!(up.media_type, "image/png");
        assert_eq!(up.bytes, PNG_MAGIC);
    }

    #[tokio::test]
    async fn load_local_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jpg");
        let err = load_upload(path.to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, Notes2TexError::FileNotFound { .. }));
    }
}
