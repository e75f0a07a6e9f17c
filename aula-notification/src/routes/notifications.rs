use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use aula_shared::errors::AppResult;
use aula_shared::types::api::ApiResponse;
use aula_shared::types::auth::AuthUser;
use aula_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::Notification;
use crate::ApiState;

/// GET /notifications
/// One page of the authenticated subscriber's feed, newest first.
pub async fn list_notifications(
    State(state): State<Arc<ApiState>>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Notification>>>> {
    let page = state.service.list(auth_user.id, &params);
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /notifications/unread-count
/// Badge count for the authenticated subscriber.
pub async fn unread_count(
    State(state): State<Arc<ApiState>>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let count = state.service.unread_count(auth_user.id);
    Ok(Json(ApiResponse::ok(UnreadCountResponse { count })))
}

#[derive(Debug, serde::Serialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// POST /notifications/read-all
/// Mark every unread notification read.
pub async fn mark_all_read(
    State(state): State<Arc<ApiState>>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<MarkAllReadResponse>>> {
    let updated = state.service.mark_all_read(auth_user.id);
    Ok(Json(ApiResponse::ok(MarkAllReadResponse { updated })))
}

#[derive(Debug, serde::Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// POST /notifications/:id/read
/// Mark a single notification read.
pub async fn mark_read(
    State(state): State<Arc<ApiState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = state.service.mark_read(auth_user.id, id)?;
    Ok(Json(ApiResponse::ok(notification)))
}

/// DELETE /notifications/:id
/// Remove a notification. Retrying a delete that already went through is
/// success, so a caller that timed out can safely re-send.
pub async fn delete_notification(
    State(state): State<Arc<ApiState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.service.delete(auth_user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
