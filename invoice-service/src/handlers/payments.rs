//! Payment handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{InvoiceResponse, RecordPaymentRequest};
use crate::middleware::ActorContext;
use crate::models::Payment;
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    pub payment: Payment,
    pub invoice: InvoiceResponse,
}

/// Record a payment against an invoice.
pub async fn record_payment(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), AppError> {
    payload.validate()?;

    let input = payload.into_create(Utc::now().date_naive());
    let (payment, invoice) = state
        .db
        .record_payment(invoice_id, &input, actor.actor_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordPaymentResponse {
            payment,
            invoice: InvoiceResponse::from(invoice),
        }),
    ))
}

/// List payments for an invoice, newest first.
pub async fn list_payments(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    let payments = state.db.list_payments(invoice_id).await?;
    Ok(Json(payments))
}
