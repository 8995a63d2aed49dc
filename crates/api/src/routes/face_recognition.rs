//! Route definitions for the `/face-recognition` resource.
//!
//! Every endpoint requires a teacher, principal, or admin token.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::face_recognition;
use crate::state::AppState;

/// Routes mounted at `/face-recognition`.
///
/// ```text
/// POST   /upload-reference                 -> upload_reference
/// POST   /mark-attendance                  -> mark_attendance
/// POST   /confirm-attendance               -> confirm_attendance
/// GET    /classes/{class_id}/status        -> class_status
/// DELETE /students/{student_id}/encoding   -> clear_encoding
/// POST   /detect                           -> detect
/// POST   /compare                          -> compare
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload-reference", post(face_recognition::upload_reference))
        .route("/mark-attendance", post(face_recognition::mark_attendance))
        .route(
            "/confirm-attendance",
            post(face_recognition::confirm_attendance),
        )
        .route(
            "/classes/{class_id}/status",
            get(face_recognition::class_status),
        )
        .route(
            "/students/{student_id}/encoding",
            delete(face_recognition::clear_encoding),
        )
        .route("/detect", post(face_recognition::detect))
        .route("/compare", post(face_recognition::compare))
}
