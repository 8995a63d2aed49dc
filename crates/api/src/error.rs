use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schoolhub_core::crypto::CipherError;
use schoolhub_core::error::CoreError;
use schoolhub_facematch::FaceMatchError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors plus the face-service, cipher, and
/// database layers. Implements [`IntoResponse`] to produce consistent JSON
/// error responses of the form `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    FaceMatch(#[from] FaceMatchError),

    #[error("Encoding cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            AppError::Database(err) => classify_sqlx_error(err),

            AppError::FaceMatch(err) => classify_face_error(err),

            AppError::Cipher(err) => {
                tracing::error!(error = %err, "Face encoding cipher failure");
                internal()
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Map face-service failures: unreachable or failing (5xx) 503, any other
/// bad upstream reply 502, business rejection 400.
fn classify_face_error(err: &FaceMatchError) -> (StatusCode, &'static str, String) {
    match err {
        FaceMatchError::Request(e) => {
            tracing::warn!(error = %e, "Face service unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "FACE_SERVICE_UNAVAILABLE",
                format!("Face recognition service unavailable: {e}"),
            )
        }
        FaceMatchError::ApiError { status, body } if *status >= 500 => {
            tracing::warn!(upstream_status = status, body = %body, "Face service failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "FACE_SERVICE_UNAVAILABLE",
                format!("Face recognition service unavailable ({status}): {body}"),
            )
        }
        FaceMatchError::ApiError { status, body } => {
            tracing::warn!(upstream_status = status, body = %body, "Face service returned an error");
            (
                StatusCode::BAD_GATEWAY,
                "FACE_SERVICE_ERROR",
                format!("Face recognition service error ({status}): {body}"),
            )
        }
        FaceMatchError::MalformedResponse(msg) => {
            tracing::warn!(error = %msg, "Face service returned a malformed response");
            (
                StatusCode::BAD_GATEWAY,
                "FACE_SERVICE_ERROR",
                format!("Face recognition service returned an invalid response: {msg}"),
            )
        }
        FaceMatchError::Rejected { message, .. } => {
            (StatusCode::BAD_REQUEST, "FACE_REJECTED", message.clone())
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations on a `uq_*` constraint map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn status_and_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn rejection_is_bad_request_with_service_message() {
        let (status, body) = status_and_body(AppError::FaceMatch(FaceMatchError::Rejected {
            message: "No face detected in the image".into(),
            face_count: Some(0),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "FACE_REJECTED");
        assert_eq!(body["error"], "No face detected in the image");
    }

    #[tokio::test]
    async fn upstream_server_errors_are_unavailable() {
        let (status, body) = status_and_body(AppError::FaceMatch(FaceMatchError::ApiError {
            status: 500,
            body: "Error encoding face".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "FACE_SERVICE_UNAVAILABLE");
        assert!(body["error"].as_str().unwrap().contains("Error encoding face"));
    }

    #[tokio::test]
    async fn other_bad_replies_are_bad_gateway() {
        let (status, body) = status_and_body(AppError::FaceMatch(FaceMatchError::ApiError {
            status: 422,
            body: "unprocessable".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "FACE_SERVICE_ERROR");

        let (status, _) = status_and_body(AppError::FaceMatch(
            FaceMatchError::MalformedResponse("bad json".into()),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn cipher_errors_are_sanitized() {
        let (status, body) = status_and_body(AppError::Cipher(CipherError::Decrypt)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn not_found_names_the_entity() {
        let (status, body) = status_and_body(AppError::Core(CoreError::NotFound {
            entity: "Student",
            id: 9,
        }))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Student with id 9 not found");
    }
}
