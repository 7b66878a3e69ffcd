//! OpenAPI documentation for the alertbox REST API

use utoipa::OpenApi;

/// OpenAPI 3.1 document served at `/openapi.json` and `/swagger-ui`
#[derive(OpenApi)]
#[openapi(
    info(
        title = "alertbox REST API",
        version = "0.1.0",
        description = "Notification storage with attachment downloads and retention",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Notifications
        crate::api::routes::list_notifications,
        crate::api::routes::add_notification,
        crate::api::routes::get_notification,
        crate::api::routes::delete_notification,

        // Attachments
        crate::api::routes::get_attachment,
        crate::api::routes::download_attachment,
        crate::api::routes::cancel_download,
        crate::api::routes::delete_attachment,
        crate::api::routes::get_attachment_content,

        // Settings
        crate::api::routes::get_settings,
        crate::api::routes::update_settings,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::run_retention_sweep,
    ),
    components(schemas(
        crate::types::NotificationId,
        crate::types::Priority,
        crate::types::Notification,
        crate::types::NewNotification,
        crate::types::NewAttachment,
        crate::types::Event,
        crate::types::SweepReport,
        crate::types::AutoDelete,
        crate::types::AutoDownload,
        crate::types::Settings,

        crate::attachment::Progress,
        crate::attachment::Attachment,
        crate::attachment::AttachmentStatus,
        crate::attachment::StatusKind,
        crate::attachment::Expiry,

        crate::api::routes::ListNotificationsQuery,
        crate::api::routes::AddNotificationResponse,
        crate::api::routes::AttachmentStatusResponse,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "notifications", description = "Store, list and delete notifications"),
        (name = "attachments", description = "Attachment status, downloads and content"),
        (name = "settings", description = "Auto-download and auto-delete policies"),
        (name = "system", description = "Health, OpenAPI, events and retention"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
