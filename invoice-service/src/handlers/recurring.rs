//! Recurring invoice handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::CreateRecurringRequest;
use crate::middleware::ActorContext;
use crate::models::{CreateRecurring, RecurringInvoice};
use crate::services::scheduler::{self, GenerationReport};
use crate::startup::AppState;

/// Create a recurring invoice schedule.
pub async fn create_recurring(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateRecurringRequest>,
) -> Result<(StatusCode, Json<RecurringInvoice>), AppError> {
    payload.validate()?;

    if let (Some(end), start) = (payload.end_date, payload.start_date) {
        if end < start {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "End date cannot precede the start date"
            )));
        }
    }

    let input = CreateRecurring::from(payload);
    let recurring = state.db.create_recurring(&input, actor.actor_id).await?;

    Ok((StatusCode::CREATED, Json(recurring)))
}

/// List recurring schedules.
pub async fn list_recurring(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecurringInvoice>>, AppError> {
    let recurring = state.db.list_recurring().await?;
    Ok(Json(recurring))
}

/// Activate a recurring schedule.
pub async fn activate_recurring(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(recurring_id): Path<Uuid>,
) -> Result<Json<RecurringInvoice>, AppError> {
    let recurring = state
        .db
        .set_recurring_active(recurring_id, true, actor.actor_id)
        .await?;
    Ok(Json(recurring))
}

/// Deactivate a recurring schedule.
pub async fn deactivate_recurring(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(recurring_id): Path<Uuid>,
) -> Result<Json<RecurringInvoice>, AppError> {
    let recurring = state
        .db
        .set_recurring_active(recurring_id, false, actor.actor_id)
        .await?;
    Ok(Json(recurring))
}

/// Generate invoices for every due schedule. Entry point for the external
/// cron collaborator.
pub async fn generate_due(
    State(state): State<AppState>,
    actor: ActorContext,
) -> Result<Json<GenerationReport>, AppError> {
    let report = scheduler::generate_due_invoices(&state.db, actor.actor_id).await?;
    Ok(Json(report))
}
