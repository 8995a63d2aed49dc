//! REST client for the face-matching service.
//!
//! Wraps the service's multipart endpoints (`/encode`, `/recognize`,
//! `/detect`, `/compare`) and `/health` using [`reqwest`]. Every response is
//! validated before it leaves this module: a reply that parses but breaks
//! the contract (wrong encoding length, non-numeric ids, confidence out of
//! range) is reported as [`FaceMatchError::MalformedResponse`].

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use schoolhub_core::attendance::Recognition;
use schoolhub_core::encoding::{validate_encoding, validate_threshold};
use schoolhub_core::types::DbId;

use crate::messages::{
    CompareResponse, CompareResult, DetectResponse, DetectedFace, EncodeResponse, KnownFace,
    RecognitionResult, RecognizeResponse,
};

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the matching service.
#[derive(Debug, Clone)]
pub struct FaceMatchConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Sent as `X-API-Key` when present.
    pub api_key: Option<String>,
    /// Whole-request timeout; recognition on large photos can be slow.
    pub timeout: Duration,
}

/// One image sent as a multipart file part.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImagePart {
    pub fn new(file_name: impl Into<String>, mime_type: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        }
    }

    fn into_part(self) -> Result<Part, FaceMatchError> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(self.mime_type)?)
    }
}

/// Errors from the matching-service client.
#[derive(Debug, thiserror::Error)]
pub enum FaceMatchError {
    /// The HTTP request itself failed (connect, timeout, TLS, etc.).
    #[error("Face service request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Face service error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The service replied 2xx with a body that violates its contract.
    #[error("Malformed face service response: {0}")]
    MalformedResponse(String),

    /// The service processed the image and declined it
    /// (no face, several faces, unreadable image).
    #[error("{message}")]
    Rejected {
        message: String,
        face_count: Option<u32>,
    },
}

/// HTTP client for a single matching-service instance.
#[derive(Debug, Clone)]
pub struct FaceMatchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FaceMatchClient {
    /// Build a client with the configured timeouts.
    pub fn new(config: FaceMatchConfig) -> Result<Self, FaceMatchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .build()?;
        Ok(Self::with_client(client, config.base_url, config.api_key))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`. Any transport failure or non-2xx status is unhealthy.
    pub async fn health(&self) -> bool {
        match self.get("/health").send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Face service health probe failed");
                false
            }
        }
    }

    /// Extract the encoding of the single face in a reference photo.
    ///
    /// Photos with zero or several faces are [`FaceMatchError::Rejected`].
    pub async fn encode(&self, image: ImagePart) -> Result<Vec<f64>, FaceMatchError> {
        let form = Form::new().part("image", image.into_part()?);
        let resp: EncodeResponse = self.post_form("/encode", form).await?;

        if !resp.success {
            return Err(FaceMatchError::Rejected {
                message: non_empty(resp.message, "Face encoding failed"),
                face_count: Some(resp.face_count),
            });
        }
        if resp.face_count != 1 {
            return Err(FaceMatchError::Rejected {
                message: format!("Expected exactly one face, found {}", resp.face_count),
                face_count: Some(resp.face_count),
            });
        }
        let encoding = resp.encoding.ok_or_else(|| {
            FaceMatchError::MalformedResponse("successful encode without encoding".into())
        })?;
        validate_encoding(&encoding)
            .map_err(|e| FaceMatchError::MalformedResponse(e.to_string()))?;
        Ok(encoding)
    }

    /// Match the faces in a group photo against the given enrolled students.
    ///
    /// Returned matches only reference ids present in `known`, with
    /// confidences in `[0, 1]`. Recognized ids outside `known` are dropped.
    /// Duplicate matches for one id keep the highest confidence.
    pub async fn recognize(
        &self,
        image: ImagePart,
        known: &[KnownFace],
        threshold: f64,
    ) -> Result<RecognitionResult, FaceMatchError> {
        validate_threshold(threshold).map_err(|e| FaceMatchError::Rejected {
            message: e.to_string(),
            face_count: None,
        })?;
        let known_json = serde_json::to_string(known)
            .map_err(|e| FaceMatchError::MalformedResponse(e.to_string()))?;

        let form = Form::new()
            .part("image", image.into_part()?)
            .text("known_faces", known_json)
            .text("threshold", threshold.to_string());
        let resp: RecognizeResponse = self.post_form("/recognize", form).await?;

        if !resp.success {
            return Err(FaceMatchError::Rejected {
                message: non_empty(resp.message, "Face recognition failed"),
                face_count: Some(resp.total_faces_detected),
            });
        }

        let mut matches: Vec<Recognition> = Vec::with_capacity(resp.recognized.len());
        for face in resp.recognized {
            let Some(student_id) = parse_known_id(&face.id, known)? else {
                tracing::warn!(id = %face.id, "Face service returned an id that was not sent, dropping");
                continue;
            };
            if !(0.0..=1.0).contains(&face.confidence) {
                return Err(FaceMatchError::MalformedResponse(format!(
                    "confidence {} for id {} is outside [0, 1]",
                    face.confidence, face.id
                )));
            }
            match matches.iter_mut().find(|m| m.student_id == student_id) {
                Some(existing) if existing.confidence >= face.confidence => {}
                Some(existing) => {
                    existing.confidence = face.confidence;
                    existing.location = face.location;
                }
                None => matches.push(Recognition {
                    student_id,
                    confidence: face.confidence,
                    location: face.location,
                }),
            }
        }

        tracing::debug!(
            faces_detected = resp.total_faces_detected,
            matched = matches.len(),
            unrecognized = resp.unrecognized_count,
            "Face service recognition complete",
        );

        Ok(RecognitionResult {
            faces_detected: resp.total_faces_detected,
            unrecognized_count: resp.unrecognized_count,
            processing_time_ms: resp.processing_time_ms,
            matches,
        })
    }

    /// Locate faces without matching them.
    pub async fn detect(&self, image: ImagePart) -> Result<Vec<DetectedFace>, FaceMatchError> {
        let form = Form::new().part("image", image.into_part()?);
        let resp: DetectResponse = self.post_form("/detect", form).await?;

        if !resp.success {
            return Err(FaceMatchError::Rejected {
                message: non_empty(resp.message, "Face detection failed"),
                face_count: None,
            });
        }
        Ok(resp.faces)
    }

    /// Compare the first face of each image.
    pub async fn compare(
        &self,
        first: ImagePart,
        second: ImagePart,
    ) -> Result<CompareResult, FaceMatchError> {
        let form = Form::new()
            .part("image1", first.into_part()?)
            .part("image2", second.into_part()?);
        let resp: CompareResponse = self.post_form("/compare", form).await?;

        if !resp.success {
            return Err(FaceMatchError::Rejected {
                message: non_empty(resp.message, "Face comparison failed"),
                face_count: None,
            });
        }
        match (resp.is_same_person, resp.confidence, resp.distance) {
            (Some(is_same_person), Some(confidence), Some(distance)) => Ok(CompareResult {
                is_same_person,
                confidence,
                distance,
            }),
            _ => Err(FaceMatchError::MalformedResponse(
                "successful compare missing result fields".into(),
            )),
        }
    }

    // ---- private helpers ----

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_key(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, FaceMatchError> {
        let response = self
            .with_key(self.client.post(format!("{}{path}", self.base_url)))
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Return the response unchanged on 2xx, or an
    /// [`FaceMatchError::ApiError`] carrying the service's `detail` message
    /// (or the raw body) otherwise.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, FaceMatchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FaceMatchError::ApiError {
                status: status.as_u16(),
                body: error_detail(&body),
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FaceMatchError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FaceMatchError::MalformedResponse(e.to_string()))
    }
}

/// Pull `detail` out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.to_string())
}

/// `Ok(None)` for a well-formed id that was not among `known`.
fn parse_known_id(id: &str, known: &[KnownFace]) -> Result<Option<DbId>, FaceMatchError> {
    let student_id = id
        .parse::<DbId>()
        .map_err(|_| FaceMatchError::MalformedResponse(format!("invalid student id '{id}'")))?;
    Ok(known.iter().any(|k| k.id == id).then_some(student_id))
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
