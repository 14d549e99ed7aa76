//! Settings handlers.

use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::UpdateSettingsRequest;
use crate::middleware::ActorContext;
use crate::models::{InvoiceSettings, UpdateSettings};
use crate::startup::AppState;

/// Get the settings singleton, creating it with defaults on first access.
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<InvoiceSettings>, AppError> {
    let settings = state.db.get_or_create_settings().await?;
    Ok(Json(settings))
}

/// Update the settings singleton.
pub async fn update_settings(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<InvoiceSettings>, AppError> {
    payload.validate()?;

    let input = UpdateSettings::from(payload);
    let settings = state.db.update_settings(&input, actor.actor_id).await?;
    Ok(Json(settings))
}
