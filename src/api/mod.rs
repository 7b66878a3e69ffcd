//! REST API server module
//!
//! Exposes notification ingest, attachment control, settings and a live
//! event stream over HTTP, documented with OpenAPI 3.1.

use crate::{AttachmentManager, Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Notifications
/// - `GET /notifications` - List notifications, newest first
/// - `POST /notifications` - Store a notification
/// - `GET /notifications/:id` - Get a single notification
/// - `DELETE /notifications/:id` - Soft-delete a notification
///
/// ## Attachments
/// - `GET /notifications/:id/attachment` - Attachment status
/// - `DELETE /notifications/:id/attachment` - Remove downloaded content
/// - `POST /notifications/:id/attachment/download` - Start a download
/// - `POST /notifications/:id/attachment/cancel` - Cancel a running download
/// - `GET /notifications/:id/attachment/content` - Stream downloaded content
///
/// ## Settings
/// - `GET /settings` - Current settings
/// - `PUT /settings` - Replace settings
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Swagger UI (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `POST /retention/sweep` - Run a retention sweep now
pub fn create_router(manager: Arc<AttachmentManager>, config: Arc<Config>) -> Router {
    let state = AppState::new(manager, config.clone());

    let router = Router::new()
        // Notifications
        .route(
            "/notifications",
            get(routes::list_notifications).post(routes::add_notification),
        )
        .route(
            "/notifications/:id",
            get(routes::get_notification).delete(routes::delete_notification),
        )
        // Attachments
        .route(
            "/notifications/:id/attachment",
            get(routes::get_attachment).delete(routes::delete_attachment),
        )
        .route(
            "/notifications/:id/attachment/download",
            post(routes::download_attachment),
        )
        .route(
            "/notifications/:id/attachment/cancel",
            post(routes::cancel_download),
        )
        .route(
            "/notifications/:id/attachment/content",
            get(routes::get_attachment_content),
        )
        // Settings
        .route(
            "/settings",
            get(routes::get_settings).put(routes::update_settings),
        )
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/retention/sweep", post(routes::run_retention_sweep));

    // SwaggerUi points at the /openapi.json route above
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    let router = if config.server.api.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.server.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    let router = router.layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        router.layer(build_cors_layer(&config.server.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer for the configured origins ("*" or empty allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the listener fails or the task is aborted.
///
/// # Example
///
/// ```no_run
/// use alertbox::{AttachmentManager, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = Arc::new(AttachmentManager::new((*config).clone()).await?);
///
/// alertbox::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<AttachmentManager>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
