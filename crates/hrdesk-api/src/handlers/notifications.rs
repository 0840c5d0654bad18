use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use hrdesk_core::models::{Notification, NotificationListQuery};
use hrdesk_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = Vec<Notification>),
        (status = 400, description = "Invalid query string", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<NotificationListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notifications = state.notifications.list(&query).await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}/notifications",
    tag = "notifications",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Notifications emitted for the report", body = Vec<Notification>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_report_notifications(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notifications = state.notifications.list_for_report(id).await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    tag = "notifications",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 204, description = "Notification marked as read"),
        (status = 404, description = "Notification not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.notifications.mark_read(id).await? {
        return Err(AppError::NotFound("Notification not found".to_string()).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
