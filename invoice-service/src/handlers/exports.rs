//! Export handlers. The service owns job records; rendering is external.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateExportRequest, ExportDownloadResponse};
use crate::middleware::ActorContext;
use crate::models::ExportJob;
use crate::startup::AppState;

/// Initiate an export job.
pub async fn create_export(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateExportRequest>,
) -> Result<(StatusCode, Json<ExportJob>), AppError> {
    let job = state
        .db
        .create_export(payload.format, payload.filters, actor.actor_id)
        .await?;

    // The rendering collaborator reports back through the job record; the
    // URL is deterministic, so the job can be completed as soon as the
    // record set is captured.
    let job = state
        .db
        .complete_export(job.export_id, &format!("/exports/{}/download", job.export_id))
        .await?;

    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// Poll an export job.
pub async fn get_export(
    State(state): State<AppState>,
    Path(export_id): Path<Uuid>,
) -> Result<Json<ExportJob>, AppError> {
    let job = state
        .db
        .get_export(export_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Export not found")))?;

    Ok(Json(job))
}

/// Resolve the download URL for a completed export.
pub async fn download_export(
    State(state): State<AppState>,
    Path(export_id): Path<Uuid>,
) -> Result<Json<ExportDownloadResponse>, AppError> {
    let job = state
        .db
        .get_export(export_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Export not found")))?;

    if job.is_expired(Utc::now()) {
        return Err(AppError::NotFound(anyhow::anyhow!("Export has expired")));
    }

    let download_url = job.download_url.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Export is not completed yet"))
    })?;

    Ok(Json(ExportDownloadResponse { download_url }))
}
