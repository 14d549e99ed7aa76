//! Recurring invoice scheduler.
//!
//! One pass materializes an invoice for every schedule that is due,
//! advancing each schedule by exactly one period. A failure generating one
//! record never blocks the others; per-record outcomes are reported the
//! same way bulk operations report per-item outcomes.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use service_core::error::AppError;
use tokio::time::timeout;
use uuid::Uuid;

use crate::models::{CreateInvoice, InvoiceType, RecurringInvoice};
use crate::services::metrics::RECURRING_GENERATED_TOTAL;
use crate::services::Database;

/// Budget for generating one invoice.
const ITEM_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome for one schedule in a generation pass.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub recurring_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate report for one generation pass.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub generated: usize,
    pub failed: usize,
    pub details: Vec<GenerationOutcome>,
    pub timestamp: DateTime<Utc>,
}

/// Process every due schedule once. Intended to be invoked periodically by
/// an external job runner.
#[tracing::instrument(skip(db), fields(actor_id = %actor_id))]
pub async fn generate_due_invoices(
    db: &Database,
    actor_id: Uuid,
) -> Result<GenerationReport, AppError> {
    let today = Utc::now().date_naive();
    let due = db.list_due_recurring(today).await?;

    tracing::info!(due = due.len(), "Recurring generation pass started");

    let mut details = Vec::with_capacity(due.len());
    let mut generated = 0usize;
    let mut failed = 0usize;

    for record in due {
        let recurring_id = record.recurring_id;
        let outcome = match timeout(ITEM_TIMEOUT, generate_one(db, &record, actor_id, today)).await
        {
            Ok(Ok(invoice_id)) => {
                generated += 1;
                GenerationOutcome {
                    recurring_id,
                    invoice_id: Some(invoice_id),
                    success: true,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                failed += 1;
                GenerationOutcome {
                    recurring_id,
                    invoice_id: None,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
            Err(_) => {
                failed += 1;
                GenerationOutcome {
                    recurring_id,
                    invoice_id: None,
                    success: false,
                    error: Some("Generation timed out".to_string()),
                }
            }
        };

        RECURRING_GENERATED_TOTAL
            .with_label_values(&[if outcome.success { "success" } else { "failure" }])
            .inc();

        details.push(outcome);
    }

    tracing::info!(generated, failed, "Recurring generation pass completed");

    Ok(GenerationReport {
        generated,
        failed,
        details,
        timestamp: Utc::now(),
    })
}

/// Materialize one invoice from a due schedule and advance the schedule.
async fn generate_one(
    db: &Database,
    record: &RecurringInvoice,
    actor_id: Uuid,
    today: NaiveDate,
) -> Result<Uuid, AppError> {
    debug_assert!(record.should_generate(today));

    let template = db
        .get_template(record.template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

    if !template.is_active {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Template '{}' is inactive",
            template.name
        )));
    }

    let data = template.template_data.0.clone();
    let bill_to = data.bill_to.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Template '{}' has no bill-to contact",
            template.name
        ))
    })?;

    if data.items.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Template '{}' has no line items",
            template.name
        )));
    }

    let input = CreateInvoice {
        invoice_number: None,
        invoice_type: InvoiceType::from_string(&template.invoice_type),
        status: None,
        customer_id: Some(record.customer_id),
        partner_id: record.partner_id,
        booking_id: None,
        bill_to,
        ship_to: data.ship_to,
        items: data.items,
        taxes: data.taxes,
        issue_date: None,
        due_date: None,
        currency: data.currency,
        discount_amount: data.discount_amount,
        discount_percentage: None,
        shipping_amount: data.shipping_amount,
        notes: template.default_notes.clone(),
        terms: template.default_terms.clone(),
        custom_fields: data.custom_fields,
    };

    // Normal creation path: amount engine, numbering, audit.
    let invoice = db.create_invoice(&input, actor_id).await?;

    let invoice = if record.auto_send {
        db.send_invoice(invoice.invoice_id, actor_id).await?
    } else {
        invoice
    };

    let next = record
        .frequency_enum()
        .advance(record.next_generation_date);
    let occurrences_after = record.current_occurrences + 1;
    let deactivate = record
        .max_occurrences
        .is_some_and(|max| occurrences_after >= max)
        || record.end_date.is_some_and(|end| next > end);

    db.advance_recurring(record.recurring_id, next, deactivate)
        .await?;

    tracing::info!(
        recurring_id = %record.recurring_id,
        invoice_id = %invoice.invoice_id,
        next_generation_date = %next,
        deactivated = deactivate,
        "Recurring invoice generated"
    );

    Ok(invoice.invoice_id)
}
