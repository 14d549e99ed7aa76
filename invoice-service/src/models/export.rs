//! Export job model. File rendering is an external collaborator; this
//! service owns the job records and their progress bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Pdf,
    Excel,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "pdf" => ExportFormat::Pdf,
            "excel" => ExportFormat::Excel,
            "json" => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

/// Export job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Processing => "processing",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "processing" => ExportStatus::Processing,
            "completed" => ExportStatus::Completed,
            "failed" => ExportStatus::Failed,
            _ => ExportStatus::Pending,
        }
    }
}

/// Export job record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExportJob {
    pub export_id: Uuid,
    pub status: String,
    pub format: String,
    pub filters: Option<serde_json::Value>,
    pub total_records: i32,
    pub processed_records: i32,
    pub download_url: Option<String>,
    pub error_message: Option<String>,
    pub requested_by: Uuid,
    pub completed_utc: Option<DateTime<Utc>>,
    pub expires_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl ExportJob {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_utc
    }
}
