//! Bulk operation types. Partial failure is a first-class return value
//! here, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operation applied across a list of invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    Send,
    Approve,
    Reject,
    Cancel,
    Delete,
    MarkPaid,
    MarkOverdue,
    Export,
}

impl BulkOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOperation::Send => "send",
            BulkOperation::Approve => "approve",
            BulkOperation::Reject => "reject",
            BulkOperation::Cancel => "cancel",
            BulkOperation::Delete => "delete",
            BulkOperation::MarkPaid => "mark_paid",
            BulkOperation::MarkOverdue => "mark_overdue",
            BulkOperation::Export => "export",
        }
    }
}

/// Outcome for one invoice inside a bulk run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemOutcome {
    pub invoice_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItemOutcome {
    pub fn ok(invoice_id: Uuid) -> Self {
        Self {
            invoice_id,
            success: true,
            error: None,
        }
    }

    pub fn failed(invoice_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            invoice_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate report for one bulk run. Callers must consult `details` for
/// per-item outcome; the call itself succeeds even when every item failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkReport {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub details: Vec<BulkItemOutcome>,
    pub timestamp: DateTime<Utc>,
}

impl BulkReport {
    pub fn from_outcomes(details: Vec<BulkItemOutcome>) -> Self {
        let successful = details.iter().filter(|d| d.success).count();
        let failed = details.len() - successful;
        Self {
            total_processed: details.len(),
            successful,
            failed,
            details,
            timestamp: Utc::now(),
        }
    }
}
