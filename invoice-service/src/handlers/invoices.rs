//! Invoice handlers: CRUD, lifecycle transitions, and bulk operations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    BulkOperationRequest, CreateInvoiceRequest, InvoiceListResponse, InvoiceResponse,
    ListInvoicesParams, MarkPaidRequest, ReasonRequest, UpdateInvoiceRequest,
};
use crate::models::{AuditEntry, BulkReport, CreateInvoice, ListInvoicesFilter, UpdateInvoice};
use crate::services::bulk;
use crate::middleware::ActorContext;
use crate::startup::AppState;

/// Create an invoice.
pub async fn create_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    payload.validate()?;

    let input = CreateInvoice::from(payload);
    let invoice = state.db.create_invoice(&input, actor.actor_id).await?;

    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}

/// List invoices with filters, sorting, and pagination.
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<ListInvoicesParams>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let filter = ListInvoicesFilter::from(params);
    let page = filter.page.max(1);
    let limit = filter.limit.clamp(1, 100);
    let (invoices, total) = state.db.list_invoices(&filter).await?;

    Ok(Json(InvoiceListResponse::new(invoices, total, page, limit)))
}

/// Get an invoice by id.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Update an invoice while it is editable.
pub async fn update_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    payload.validate()?;

    let input = UpdateInvoice::from(payload);
    let invoice = state
        .db
        .update_invoice(invoice_id, &input, actor.actor_id)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Delete a draft invoice.
pub async fn delete_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.db.delete_invoice(invoice_id, actor.actor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send a draft invoice.
pub async fn send_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.db.send_invoice(invoice_id, actor.actor_id).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Approve a pending invoice.
pub async fn approve_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.db.approve_invoice(invoice_id, actor.actor_id).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Reject a pending invoice. The reason is required.
pub async fn reject_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    payload.validate()?;

    let invoice = state
        .db
        .reject_invoice(invoice_id, &payload.reason, actor.actor_id)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Cancel an invoice. The reason is required.
pub async fn cancel_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    payload.validate()?;

    let invoice = state
        .db
        .cancel_invoice(invoice_id, &payload.reason, actor.actor_id)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Void an invoice. The reason is required.
pub async fn void_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    payload.validate()?;

    let invoice = state
        .db
        .void_invoice(invoice_id, &payload.reason, actor.actor_id)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Settle an invoice by recording its outstanding balance as a payment.
pub async fn mark_paid(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<MarkPaidRequest>>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let input = request.into_create(Utc::now().date_naive());
    let invoice = state
        .db
        .mark_paid(invoice_id, &input, actor.actor_id)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Mark an invoice overdue.
pub async fn mark_overdue(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.db.mark_overdue(invoice_id, actor.actor_id).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Apply one operation across many invoices. Per-item failures land in the
/// report, never in the response status.
pub async fn bulk_operation(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<BulkOperationRequest>,
) -> Result<Json<BulkReport>, AppError> {
    payload.validate()?;

    let report = bulk::execute(
        &state.db,
        payload.operation,
        &payload.invoice_ids,
        payload.reason.as_deref(),
        actor.actor_id,
    )
    .await?;

    Ok(Json(report))
}

/// Read the audit trail for an invoice.
pub async fn get_audit_trail(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    let entries = state.db.list_audit_trail(invoice_id).await?;
    Ok(Json(entries))
}
