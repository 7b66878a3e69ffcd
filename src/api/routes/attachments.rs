//! Attachment handlers: status, download control and content.

use super::AttachmentStatusResponse;
use crate::api::AppState;
use crate::error::{DownloadError, Error};
use crate::types::NotificationId;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio_util::io::ReaderStream;

/// GET /notifications/:id/attachment - Attachment status
#[utoipa::path(
    get,
    path = "/notifications/{id}/attachment",
    tag = "attachments",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Attachment and its status", body = AttachmentStatusResponse),
        (status = 404, description = "Notification or attachment not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AttachmentStatusResponse>, Error> {
    let id = NotificationId::new(id);
    let attachment = state
        .manager
        .get_notification(&id)
        .await?
        .attachment
        .ok_or_else(|| DownloadError::NoAttachment { id: id.to_string() })?;
    let status = state.manager.attachment_status(&id).await?;

    Ok(Json(AttachmentStatusResponse {
        attachment,
        summary: status.to_string(),
        can_download: status.can_download(),
        status,
    }))
}

/// POST /notifications/:id/attachment/download - Start a user-requested download
///
/// Bypasses the auto-download size policy.
#[utoipa::path(
    post,
    path = "/notifications/{id}/attachment/download",
    tag = "attachments",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 202, description = "Download started"),
        (status = 404, description = "Notification or attachment not found"),
        (status = 409, description = "Download already running or content already present"),
        (status = 410, description = "Attachment link expired"),
        (status = 503, description = "Shutting down")
    )
)]
pub async fn download_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    state.manager.enqueue(&NotificationId::new(id), true).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({"status": "accepted"}))))
}

/// POST /notifications/:id/attachment/cancel - Cancel a running download
///
/// Succeeds when nothing is running.
#[utoipa::path(
    post,
    path = "/notifications/{id}/attachment/cancel",
    tag = "attachments",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "No download is running for the notification anymore"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn cancel_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    state.manager.cancel(&NotificationId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /notifications/:id/attachment - Remove downloaded content
#[utoipa::path(
    delete,
    path = "/notifications/{id}/attachment",
    tag = "attachments",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Content removed"),
        (status = 404, description = "Notification or attachment not found"),
        (status = 409, description = "Attachment is not downloaded"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    state
        .manager
        .delete_attachment(&NotificationId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /notifications/:id/attachment/content - Stream downloaded content
#[utoipa::path(
    get,
    path = "/notifications/{id}/attachment/content",
    tag = "attachments",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Attachment bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Attachment not downloaded"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_attachment_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, Error> {
    let (attachment, content) = state
        .manager
        .open_content(&NotificationId::new(id))
        .await?;

    let mime_type = attachment
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!(
        "inline; filename=\"{}\"",
        attachment.name.replace(['"', '\\'], "")
    );
    let body = Body::from_stream(ReaderStream::new(content.reader));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CONTENT_LENGTH, content.size.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
