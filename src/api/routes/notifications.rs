//! Notification handlers.

use super::{AddNotificationResponse, ListNotificationsQuery};
use crate::api::AppState;
use crate::error::Error;
use crate::types::{NewNotification, Notification, NotificationId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /notifications - List notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = Vec<Notification>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, Error> {
    let notifications = state
        .manager
        .list_notifications(query.include_deleted)
        .await?;
    Ok(Json(notifications))
}

/// POST /notifications - Store a notification
///
/// An attachment is downloaded automatically if the auto-download policy allows.
#[utoipa::path(
    post,
    path = "/notifications",
    tag = "notifications",
    request_body = NewNotification,
    responses(
        (status = 201, description = "Notification stored", body = AddNotificationResponse),
        (status = 400, description = "Malformed notification"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_notification(
    State(state): State<AppState>,
    Json(new): Json<NewNotification>,
) -> Result<impl IntoResponse, Error> {
    let id = state.manager.add_notification(new).await?;
    Ok((StatusCode::CREATED, Json(AddNotificationResponse { id })))
}

/// GET /notifications/:id - Get a single notification
#[utoipa::path(
    get,
    path = "/notifications/{id}",
    tag = "notifications",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification", body = Notification),
        (status = 404, description = "Notification not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, Error> {
    let notification = state
        .manager
        .get_notification(&NotificationId::new(id))
        .await?;
    Ok(Json(notification))
}

/// DELETE /notifications/:id - Soft-delete a notification
#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "notifications",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    state
        .manager
        .delete_notification(&NotificationId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
