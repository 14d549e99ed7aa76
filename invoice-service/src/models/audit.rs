//! Audit trail model. Entries are append-only and never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Action code recorded against an invoice mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    Sent,
    Approved,
    Rejected,
    Cancelled,
    Voided,
    MarkedOverdue,
    PaymentRecorded,
    ReminderSent,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::Deleted => "deleted",
            AuditAction::Sent => "sent",
            AuditAction::Approved => "approved",
            AuditAction::Rejected => "rejected",
            AuditAction::Cancelled => "cancelled",
            AuditAction::Voided => "voided",
            AuditAction::MarkedOverdue => "marked_overdue",
            AuditAction::PaymentRecorded => "payment_recorded",
            AuditAction::ReminderSent => "reminder_sent",
        }
    }
}

/// One immutable audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub audit_id: Uuid,
    pub invoice_id: Uuid,
    pub action: String,
    pub description: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub performed_by: Uuid,
    pub performed_utc: DateTime<Utc>,
}
