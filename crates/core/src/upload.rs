//! Image upload validation.
//!
//! Uploaded photos are checked by content, not by file name: the first bytes
//! must identify a JPEG or PNG.

use image::ImageFormat;

use crate::error::CoreError;

/// Default per-file upload limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accepted image kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// File extension used when the upload is written to disk.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// MIME type forwarded to the matching service.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Validate an uploaded image's size and sniff its format.
///
/// `field` names the multipart field in error messages.
pub fn validate_image(field: &str, data: &[u8], max_bytes: usize) -> Result<ImageKind, CoreError> {
    if data.is_empty() {
        return Err(CoreError::Validation(format!("'{field}' is empty")));
    }
    if data.len() > max_bytes {
        return Err(CoreError::Validation(format!(
            "'{field}' is {} bytes; the limit is {max_bytes} bytes",
            data.len()
        )));
    }
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => Ok(ImageKind::Jpeg),
        Ok(ImageFormat::Png) => Ok(ImageKind::Png),
        _ => Err(CoreError::Validation(format!(
            "'{field}' must be a JPEG or PNG image"
        ))),
    }
}
