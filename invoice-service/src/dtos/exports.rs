//! Export request/response DTOs.

use serde::{Deserialize, Serialize};

use crate::models::ExportFormat;

/// Body for `POST /exports`.
#[derive(Debug, Deserialize)]
pub struct CreateExportRequest {
    pub format: ExportFormat,
    pub filters: Option<serde_json::Value>,
}

/// Response for `GET /exports/:id/download`.
#[derive(Debug, Serialize)]
pub struct ExportDownloadResponse {
    pub download_url: String,
}
