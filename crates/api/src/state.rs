use std::sync::Arc;

use schoolhub_core::crypto::EncodingCipher;
use schoolhub_events::EventBus;
use schoolhub_facematch::FaceMatchClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is a pool handle or behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: schoolhub_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Client for the face-matching service.
    pub face_client: Arc<FaceMatchClient>,
    /// Seals and opens stored face encodings.
    pub cipher: Arc<EncodingCipher>,
    pub event_bus: Arc<EventBus>,
}
