//! Face encoding constants and validation.
//!
//! Encodings are produced by the matching service and treated as opaque
//! vectors here; the only checks are shape and finiteness.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Dimensionality of encodings produced by the matching service.
pub const ENCODING_DIMENSION: usize = 128;

/// Similarity threshold sent with every group-photo match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

/// Maximum number of group photos accepted by one mark-attendance request.
pub const MAX_GROUP_PHOTOS: usize = 5;

/// Pixel bounding box of a detected face, in the service's
/// `(top, right, bottom, left)` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Validate that an encoding has the expected dimension and only finite values.
pub fn validate_encoding(encoding: &[f64]) -> Result<(), CoreError> {
    if encoding.len() != ENCODING_DIMENSION {
        return Err(CoreError::Validation(format!(
            "Encoding must be {ENCODING_DIMENSION}-dimensional, got {}",
            encoding.len()
        )));
    }
    if encoding.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::Validation(
            "Encoding contains non-finite values".into(),
        ));
    }
    Ok(())
}

/// Validate that a similarity threshold is within `(0.0, 1.0]`.
pub fn validate_threshold(threshold: f64) -> Result<(), CoreError> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Match threshold must be in (0.0, 1.0], got {threshold}"
        )))
    }
}
