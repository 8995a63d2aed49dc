//! Wire types for the face-matching service.
//!
//! `*Response` structs mirror the service's JSON exactly. The validated
//! results handed to callers ([`RecognitionResult`], [`CompareResult`]) are
//! built from them in [`crate::client`]; ids are parsed back into
//! [`DbId`]s and confidences range-checked there.

use serde::{Deserialize, Serialize};
use schoolhub_core::attendance::Recognition;
use schoolhub_core::encoding::FaceLocation;
use schoolhub_core::types::DbId;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One enrolled student sent in the `known_faces` form field of `/recognize`.
///
/// The service keys faces by string id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownFace {
    pub id: String,
    pub roll_number: String,
    pub name: String,
    pub encoding: Vec<f64>,
}

impl KnownFace {
    pub fn new(
        student_id: DbId,
        roll_number: impl Into<String>,
        name: impl Into<String>,
        encoding: Vec<f64>,
    ) -> Self {
        Self {
            id: student_id.to_string(),
            roll_number: roll_number.into(),
            name: name.into(),
            encoding,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw responses
// ---------------------------------------------------------------------------

/// Body of `POST /encode`.
#[derive(Debug, Clone, Deserialize)]
pub struct EncodeResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub encoding: Option<Vec<f64>>,
    #[serde(default)]
    pub face_count: u32,
}

/// One matched face in a `/recognize` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedFace {
    pub id: String,
    #[serde(default)]
    pub roll_number: String,
    #[serde(default)]
    pub name: String,
    pub confidence: f64,
    pub location: Option<FaceLocation>,
}

/// Body of `POST /recognize`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognizeResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub total_faces_detected: u32,
    #[serde(default)]
    pub recognized: Vec<RecognizedFace>,
    #[serde(default)]
    pub unrecognized_count: u32,
    #[serde(default)]
    pub processing_time_ms: f64,
}

/// One face returned by `POST /detect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedFace {
    pub location: FaceLocation,
    pub width: i32,
    pub height: i32,
}

/// Body of `POST /detect`.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub face_count: u32,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
}

/// Body of `POST /compare`. On `success = false` only `message` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub is_same_person: Option<bool>,
    pub confidence: Option<f64>,
    pub distance: Option<f64>,
}

// ---------------------------------------------------------------------------
// Validated results
// ---------------------------------------------------------------------------

/// Validated outcome of one `/recognize` call.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub faces_detected: u32,
    pub unrecognized_count: u32,
    pub processing_time_ms: f64,
    pub matches: Vec<Recognition>,
}

/// Validated outcome of a `/compare` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    pub is_same_person: bool,
    pub confidence: f64,
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_face_serializes_service_field_names() {
        let face = KnownFace::new(42, "07", "Ada Lovelace", vec![0.5, -0.25]);
        let json = serde_json::to_value(&face).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "42",
                "rollNumber": "07",
                "name": "Ada Lovelace",
                "encoding": [0.5, -0.25],
            })
        );
    }

    #[test]
    fn recognize_response_parses_service_shape() {
        let body = r#"{
            "success": true,
            "message": "Recognized 1 out of 3 faces",
            "total_faces_detected": 3,
            "recognized": [{
                "id": "11", "rollNumber": "01", "name": "S One",
                "confidence": 0.91,
                "location": {"top": 1, "right": 50, "bottom": 60, "left": 5}
            }],
            "unrecognized_count": 2,
            "processing_time_ms": 123.4
        }"#;
        let parsed: RecognizeResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.total_faces_detected, 3);
        assert_eq!(parsed.recognized.len(), 1);
        assert_eq!(parsed.recognized[0].roll_number, "01");
        assert_eq!(parsed.recognized[0].location.unwrap().right, 50);
        assert_eq!(parsed.unrecognized_count, 2);
    }

    #[test]
    fn encode_failure_parses_without_encoding() {
        let body = r#"{"success": false, "message": "No face detected in the image", "face_count": 0}"#;
        let parsed: EncodeResponse = serde_json::from_str(body).unwrap();
        assert!(!parsed.success);
        assert!(parsed.encoding.is_none());
        assert_eq!(parsed.face_count, 0);
    }
}
