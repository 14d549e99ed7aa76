//! Analytics handlers: read-only aggregations over the record store.

use axum::{extract::Query, extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use service_core::error::AppError;

use crate::services::database::{AgingBucket, InvoiceSummary, RevenuePoint};
use crate::startup::AppState;

/// Aggregate counts and totals.
pub async fn summary(State(state): State<AppState>) -> Result<Json<InvoiceSummary>, AppError> {
    let summary = state.db.invoice_summary().await?;
    Ok(Json(summary))
}

/// Receivables aging buckets.
pub async fn aging_report(
    State(state): State<AppState>,
) -> Result<Json<Vec<AgingBucket>>, AppError> {
    let buckets = state.db.aging_report(Utc::now().date_naive()).await?;
    Ok(Json(buckets))
}

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

/// Daily paid revenue between two dates.
pub async fn revenue_trends(
    State(state): State<AppState>,
    Query(params): Query<TrendsParams>,
) -> Result<Json<Vec<RevenuePoint>>, AppError> {
    if params.date_to < params.date_from {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "date_to cannot precede date_from"
        )));
    }

    let points = state
        .db
        .revenue_trends(params.date_from, params.date_to)
        .await?;
    Ok(Json(points))
}
