//! Reminder request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CreateReminder, ReminderType};

/// Body for `POST /invoices/:id/reminders`.
#[derive(Debug, Default, Deserialize)]
pub struct SendReminderRequest {
    #[serde(rename = "type")]
    pub reminder_type: Option<ReminderType>,
    pub message: Option<String>,
    pub additional_emails: Option<Vec<String>>,
}

impl From<SendReminderRequest> for CreateReminder {
    fn from(req: SendReminderRequest) -> Self {
        CreateReminder {
            reminder_type: req.reminder_type.unwrap_or(ReminderType::Email),
            message: req.message,
            additional_emails: req.additional_emails,
        }
    }
}

/// Outcome for one invoice in the send-all-overdue pass.
#[derive(Debug, Serialize)]
pub struct OverdueReminderOutcome {
    pub invoice_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate report for the send-all-overdue pass.
#[derive(Debug, Serialize)]
pub struct OverdueReminderReport {
    pub sent: usize,
    pub failed: usize,
    pub details: Vec<OverdueReminderOutcome>,
    pub timestamp: DateTime<Utc>,
}
