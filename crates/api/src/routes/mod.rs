pub mod attendance;
pub mod auth;
pub mod face_recognition;
pub mod health;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout
///
/// /face-recognition/upload-reference               enroll a reference photo
/// /face-recognition/mark-attendance                recognize a group photo
/// /face-recognition/confirm-attendance             persist reviewed attendance
/// /face-recognition/classes/{class_id}/status      enrollment status
/// /face-recognition/students/{student_id}/encoding clear an enrollment
/// /face-recognition/detect                         detect faces
/// /face-recognition/compare                        compare two photos
///
/// /attendance/classes/{class_id}                   class attendance for a day
/// /attendance/students/{student_id}                student history
///
/// /notifications                                   list
/// /notifications/{id}/read                         mark read
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/face-recognition", face_recognition::router())
        .nest("/attendance", attendance::router())
        .nest("/notifications", notification::router())
}
