//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use schoolhub_core::error::CoreError;
use schoolhub_core::roles::is_staff;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires a staff role (principal, teacher, or admin). 403 otherwise.
///
/// ```ignore
/// async fn take_attendance(RequireStaff(user): RequireStaff) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_staff(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Teacher, principal, or admin role required".into(),
            )));
        }
        Ok(RequireStaff(user))
    }
}
