//! Reminder handlers. Recording and audit only; delivery is an external
//! notification collaborator.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{OverdueReminderOutcome, OverdueReminderReport, SendReminderRequest};
use crate::middleware::ActorContext;
use crate::models::{CreateReminder, Reminder, ReminderType};
use crate::startup::AppState;

/// Record a reminder for one invoice.
pub async fn send_reminder(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<SendReminderRequest>>,
) -> Result<(StatusCode, Json<Reminder>), AppError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let input = CreateReminder::from(request);
    let reminder = state
        .db
        .create_reminder(invoice_id, &input, actor.actor_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reminder)))
}

/// Record a reminder for every overdue invoice. One failing invoice never
/// blocks the rest of the pass.
pub async fn send_overdue_reminders(
    State(state): State<AppState>,
    actor: ActorContext,
) -> Result<Json<OverdueReminderReport>, AppError> {
    let today = Utc::now().date_naive();
    let overdue = state.db.list_overdue_candidates(today).await?;

    let mut details = Vec::with_capacity(overdue.len());
    let mut sent = 0usize;
    let mut failed = 0usize;

    for invoice in overdue {
        let input = CreateReminder {
            reminder_type: ReminderType::Email,
            message: Some(format!(
                "Invoice {} is overdue (due {})",
                invoice.invoice_number, invoice.due_date
            )),
            additional_emails: None,
        };

        match state
            .db
            .create_reminder(invoice.invoice_id, &input, actor.actor_id)
            .await
        {
            Ok(_) => {
                sent += 1;
                details.push(OverdueReminderOutcome {
                    invoice_id: invoice.invoice_id,
                    success: true,
                    error: None,
                });
            }
            Err(e) => {
                failed += 1;
                details.push(OverdueReminderOutcome {
                    invoice_id: invoice.invoice_id,
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(Json(OverdueReminderReport {
        sent,
        failed,
        details,
        timestamp: Utc::now(),
    }))
}
