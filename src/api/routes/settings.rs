//! Settings handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::types::Settings;
use axum::{Json, extract::State};

/// GET /settings - Current persisted settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Current settings", body = Settings),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, Error> {
    Ok(Json(state.manager.settings().await?))
}

/// PUT /settings - Replace persisted settings
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    request_body = Settings,
    responses(
        (status = 200, description = "Settings updated", body = Settings),
        (status = 400, description = "Malformed settings"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Result<Json<Settings>, Error> {
    state.manager.update_settings(settings).await?;
    Ok(Json(settings))
}
