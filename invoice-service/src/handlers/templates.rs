//! Template handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateTemplateRequest, UpdateTemplateRequest};
use crate::middleware::ActorContext;
use crate::models::{CreateTemplate, InvoiceTemplate, UpdateTemplate};
use crate::startup::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListTemplatesParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create a template.
pub async fn create_template(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<InvoiceTemplate>), AppError> {
    payload.validate()?;

    let input = CreateTemplate::from(payload);
    let template = state.db.create_template(&input, actor.actor_id).await?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// List templates; active only unless asked otherwise.
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<ListTemplatesParams>,
) -> Result<Json<Vec<InvoiceTemplate>>, AppError> {
    let templates = state.db.list_templates(!params.include_inactive).await?;
    Ok(Json(templates))
}

/// Update a template.
pub async fn update_template(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(template_id): Path<Uuid>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> Result<Json<InvoiceTemplate>, AppError> {
    payload.validate()?;

    let input = UpdateTemplate::from(payload);
    let template = state
        .db
        .update_template(template_id, &input, actor.actor_id)
        .await?;

    Ok(Json(template))
}

/// Delete a template.
pub async fn delete_template(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(template_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.db.delete_template(template_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
