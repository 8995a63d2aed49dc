use std::path::PathBuf;
use std::time::Duration;

use schoolhub_core::encoding::MAX_GROUP_PHOTOS;
use schoolhub_core::upload::DEFAULT_MAX_UPLOAD_BYTES;
use schoolhub_facematch::FaceMatchConfig;

use crate::auth::jwt::JwtConfig;

/// Headroom on top of the image bytes for multipart framing and text fields.
const BODY_LIMIT_OVERHEAD: usize = 1024 * 1024;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Whole-request timeout. Must exceed the face service timeout.
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub face_service: FaceMatchConfig,
    /// Secret the face-encoding cipher key is derived from.
    pub face_encoding_key: String,
    /// Root for temporary uploads and stored reference photos.
    pub upload_dir: PathBuf,
    /// Per-image size limit in bytes.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                  |
    /// |-----------------------------|--------------------------|
    /// | `HOST`                      | `0.0.0.0`                |
    /// | `PORT`                      | `3000`                   |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`      | `90`                     |
    /// | `FACE_SERVICE_URL`          | `http://localhost:8000`  |
    /// | `FACE_SERVICE_API_KEY`      | unset                    |
    /// | `FACE_SERVICE_TIMEOUT_SECS` | `60`                     |
    /// | `FACE_ENCODING_KEY`         | **required**             |
    /// | `UPLOAD_DIR`                | `storage/uploads`        |
    /// | `MAX_UPLOAD_BYTES`          | `10485760`               |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on unparsable numbers or a missing `FACE_ENCODING_KEY`, so
    /// misconfiguration fails at boot.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "90".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let face_timeout_secs: u64 = std::env::var("FACE_SERVICE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("FACE_SERVICE_TIMEOUT_SECS must be a valid u64");

        let face_service = FaceMatchConfig {
            base_url: std::env::var("FACE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".into()),
            api_key: std::env::var("FACE_SERVICE_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(face_timeout_secs),
        };

        let face_encoding_key = std::env::var("FACE_ENCODING_KEY")
            .expect("FACE_ENCODING_KEY must be set in the environment");
        assert!(
            !face_encoding_key.is_empty(),
            "FACE_ENCODING_KEY must not be empty"
        );

        let upload_dir =
            PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "storage/uploads".into()));

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        if request_timeout_secs <= face_timeout_secs {
            tracing::warn!(
                request_timeout_secs,
                face_timeout_secs,
                "REQUEST_TIMEOUT_SECS does not exceed FACE_SERVICE_TIMEOUT_SECS; \
                 slow recognitions will time out at the HTTP layer"
            );
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            face_service,
            face_encoding_key,
            upload_dir,
            max_upload_bytes,
        }
    }

    /// Directory for request-scoped uploads (removed on drop).
    pub fn temp_upload_dir(&self) -> PathBuf {
        self.upload_dir.join("tmp")
    }

    /// Directory where accepted reference photos are kept.
    pub fn reference_photo_dir(&self) -> PathBuf {
        self.upload_dir.join("reference")
    }

    /// Request body limit: a full set of group photos plus form overhead.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes * MAX_GROUP_PHOTOS + BODY_LIMIT_OVERHEAD
    }
}
