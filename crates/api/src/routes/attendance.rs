//! Route definitions for the `/attendance` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::attendance;
use crate::state::AppState;

/// Routes mounted at `/attendance`.
///
/// ```text
/// GET /classes/{class_id}?date=        -> class_attendance (staff)
/// GET /students/{student_id}?from=&to= -> student_history (staff or linked parent)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/classes/{class_id}", get(attendance::class_attendance))
        .route("/students/{student_id}", get(attendance::student_history))
}
