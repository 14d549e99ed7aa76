//! Bulk operation executor.
//!
//! Applies one operation across a list of invoice ids, isolating each item
//! in its own error boundary. Partial failure is the normal case here: the
//! executor never aborts the batch because one item was missing, guarded,
//! or slow. Callers must consult the report's `details`, not the absence of
//! an error, for per-item outcome.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use service_core::error::AppError;
use tokio::time::timeout;
use uuid::Uuid;

use crate::models::{
    BulkItemOutcome, BulkOperation, BulkReport, CreatePayment, ExportFormat, PaymentMethod,
};
use crate::services::metrics::BULK_ITEMS_TOTAL;
use crate::services::Database;

/// Budget for one item. A single slow item must not stall the whole batch.
const ITEM_TIMEOUT: Duration = Duration::from_secs(30);

/// Run one bulk operation over the given invoice ids.
#[tracing::instrument(skip(db, invoice_ids), fields(operation = operation.as_str(), items = invoice_ids.len(), actor_id = %actor_id))]
pub async fn execute(
    db: &Database,
    operation: BulkOperation,
    invoice_ids: &[Uuid],
    reason: Option<&str>,
    actor_id: Uuid,
) -> Result<BulkReport, AppError> {
    if invoice_ids.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Bulk operation requires at least one invoice id"
        )));
    }

    // Export is batch-shaped rather than per-invoice: one job covering the
    // requested ids, with per-id existence reported in the details.
    if operation == BulkOperation::Export {
        return execute_export(db, invoice_ids, actor_id).await;
    }

    let mut details = Vec::with_capacity(invoice_ids.len());

    for &invoice_id in invoice_ids {
        let outcome = match timeout(ITEM_TIMEOUT, apply_one(db, operation, invoice_id, reason, actor_id))
            .await
        {
            Ok(Ok(())) => BulkItemOutcome::ok(invoice_id),
            Ok(Err(e)) => BulkItemOutcome::failed(invoice_id, e.to_string()),
            Err(_) => BulkItemOutcome::failed(invoice_id, "Operation timed out"),
        };

        BULK_ITEMS_TOTAL
            .with_label_values(&[
                operation.as_str(),
                if outcome.success { "success" } else { "failure" },
            ])
            .inc();

        details.push(outcome);
    }

    let report = BulkReport::from_outcomes(details);

    tracing::info!(
        operation = operation.as_str(),
        total = report.total_processed,
        successful = report.successful,
        failed = report.failed,
        "Bulk operation completed"
    );

    Ok(report)
}

/// Apply the operation to one invoice. Every path goes through the guarded
/// single-invoice operation, so re-running a batch cannot silently repeat
/// work: an already-sent invoice rejects a second `send`.
async fn apply_one(
    db: &Database,
    operation: BulkOperation,
    invoice_id: Uuid,
    reason: Option<&str>,
    actor_id: Uuid,
) -> Result<(), AppError> {
    match operation {
        BulkOperation::Send => {
            db.send_invoice(invoice_id, actor_id).await?;
        }
        BulkOperation::Approve => {
            db.approve_invoice(invoice_id, actor_id).await?;
        }
        BulkOperation::Reject => {
            db.reject_invoice(invoice_id, reason.unwrap_or("Bulk rejection"), actor_id)
                .await?;
        }
        BulkOperation::Cancel => {
            db.cancel_invoice(invoice_id, reason.unwrap_or("Bulk cancellation"), actor_id)
                .await?;
        }
        BulkOperation::Delete => {
            db.delete_invoice(invoice_id, actor_id).await?;
        }
        BulkOperation::MarkPaid => {
            let closing = CreatePayment {
                amount: rust_decimal::Decimal::ZERO, // replaced by the outstanding balance
                method: PaymentMethod::Other,
                payment_date: Utc::now().date_naive(),
                reference: None,
                notes: Some("Settled via bulk operation".to_string()),
            };
            db.mark_paid(invoice_id, &closing, actor_id).await?;
        }
        BulkOperation::MarkOverdue => {
            db.mark_overdue(invoice_id, actor_id).await?;
        }
        BulkOperation::Export => unreachable!("export is handled as a batch"),
    }
    Ok(())
}

async fn execute_export(
    db: &Database,
    invoice_ids: &[Uuid],
    actor_id: Uuid,
) -> Result<BulkReport, AppError> {
    let mut details = Vec::with_capacity(invoice_ids.len());

    for &invoice_id in invoice_ids {
        let outcome = match db.get_invoice(invoice_id).await {
            Ok(Some(_)) => BulkItemOutcome::ok(invoice_id),
            Ok(None) => BulkItemOutcome::failed(invoice_id, "Invoice not found"),
            Err(e) => BulkItemOutcome::failed(invoice_id, e.to_string()),
        };
        details.push(outcome);
    }

    let exportable: Vec<Uuid> = details
        .iter()
        .filter(|d| d.success)
        .map(|d| d.invoice_id)
        .collect();

    if !exportable.is_empty() {
        let job = db
            .create_export(
                ExportFormat::Csv,
                Some(json!({ "invoice_ids": exportable })),
                actor_id,
            )
            .await?;
        db.complete_export(job.export_id, &format!("/exports/{}/download", job.export_id))
            .await?;
    }

    Ok(BulkReport::from_outcomes(details))
}
