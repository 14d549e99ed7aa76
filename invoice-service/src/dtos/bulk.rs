//! Bulk operation request DTO.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::BulkOperation;

/// Body for `POST /invoices/bulk`.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkOperationRequest {
    #[validate(length(min = 1, message = "At least one invoice id is required"))]
    pub invoice_ids: Vec<Uuid>,
    pub operation: BulkOperation,
    pub reason: Option<String>,
}
