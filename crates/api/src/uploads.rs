//! Upload handling: multipart field readers and the temporary-file guard.
//!
//! Images are validated and held in memory. One that may outlive the request
//! (a reference photo) is staged to disk inside a [`TempUpload`]; dropping
//! the guard removes the file, so early returns and panics clean up, and
//! [`TempUpload::persist`] moves it into place once the encoding is stored.

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use schoolhub_core::upload::{validate_image, ImageKind};
use schoolhub_facematch::ImagePart;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// TempUpload
// ---------------------------------------------------------------------------

/// A file on disk that is deleted when this guard is dropped.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    armed: bool,
}

impl TempUpload {
    /// Write `bytes` to a uniquely named file in `dir`.
    pub async fn write(dir: &Path, kind: ImageKind, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.{}", Uuid::new_v4(), kind.extension()));
        // Arm before writing so a partial file is also removed.
        let guard = Self { path, armed: true };
        tokio::fs::write(&guard.path, bytes).await?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the file to `dest_dir/file_name` and disarm the guard.
    ///
    /// On failure the guard stays armed and the temporary file is removed
    /// when it drops.
    pub async fn persist(mut self, dest_dir: &Path, file_name: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(file_name);
        if tokio::fs::rename(&self.path, &dest).await.is_err() {
            // Cross-device moves cannot rename.
            tokio::fs::copy(&self.path, &dest).await?;
            let _ = tokio::fs::remove_file(&self.path).await;
        }
        self.armed = false;
        Ok(dest)
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temporary upload"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temporary upload")
            }
        }
    }
}

/// Best-effort removal of a stored file that is no longer referenced.
pub async fn remove_stored_file(path: &str) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path, error = %e, "Failed to remove stored file");
        }
    }
}

// ---------------------------------------------------------------------------
// Multipart helpers
// ---------------------------------------------------------------------------

/// A validated image read from a multipart field.
#[derive(Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Write the image into a guarded temporary file.
    pub async fn stage(&self, dir: &Path) -> AppResult<TempUpload> {
        TempUpload::write(dir, self.kind, &self.bytes)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))
    }

    /// The request part sent to the face service.
    pub fn to_part(&self) -> ImagePart {
        ImagePart::new(self.file_name.clone(), self.kind.mime_type(), self.bytes.clone())
    }
}

/// Read a file field and check it is a JPEG/PNG within `max_bytes`.
pub async fn read_image_field(field: Field<'_>, max_bytes: usize) -> AppResult<UploadedImage> {
    let name = field.name().unwrap_or("file").to_string();
    let file_name = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{name}.jpg"));
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let kind = validate_image(&name, &data, max_bytes)?;
    Ok(UploadedImage {
        file_name,
        kind,
        bytes: data.to_vec(),
    })
}

pub async fn read_text_field(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map(|t| t.trim().to_string())
        .map_err(|e| AppError::BadRequest(e.to_string()))
}
