//! Handlers for the caller's in-app notifications.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use schoolhub_core::error::CoreError;
use schoolhub_core::types::DbId;
use schoolhub_db::models::notification::Notification;
use schoolhub_db::repositories::NotificationRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl NotificationQuery {
    fn page(&self) -> PaginationParams {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub unread_count: i64,
    pub items: Vec<Notification>,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<NotificationList>>> {
    let page = params.page();
    let items = NotificationRepo::list_for_user(
        &state.pool,
        auth.user_id,
        params.unread_only,
        page.limit_or(DEFAULT_LIMIT, MAX_LIMIT),
        page.offset(),
    )
    .await?;
    let unread_count = NotificationRepo::count_unread(&state.pool, auth.user_id).await?;

    Ok(Json(DataResponse {
        data: NotificationList {
            unread_count,
            items,
        },
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// 204 on success; 404 when the notification is not the caller's.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let found = NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id).await?;
    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}
