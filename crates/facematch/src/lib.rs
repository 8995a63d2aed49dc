//! Client library for the face-matching microservice.
//!
//! The service does all detection, encoding and matching. This crate wraps
//! its HTTP endpoints (`/encode`, `/recognize`, `/detect`, `/compare`,
//! `/health`) with typed wire messages and validates every response before
//! handing it to the rest of the application.

pub mod client;
pub mod messages;

pub use client::{FaceMatchClient, FaceMatchConfig, FaceMatchError, ImagePart};
pub use messages::{CompareResult, DetectedFace, KnownFace, RecognitionResult};
