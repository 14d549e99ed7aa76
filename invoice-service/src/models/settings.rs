//! Invoice settings: a process-wide singleton row holding defaults and the
//! numbering counter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::invoice::Contact;

/// Settings record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceSettings {
    pub settings_id: Uuid,
    pub default_currency: String,
    pub default_payment_terms: i32,
    pub auto_generate_numbers: bool,
    pub number_prefix: String,
    pub next_number: i64,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
    pub enable_reminders: bool,
    pub reminder_schedule: Json<Vec<i32>>,
    pub enable_late_fees: bool,
    pub late_fee_percentage: Decimal,
    pub logo_url: Option<String>,
    pub company_details: Option<Json<Contact>>,
    pub updated_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Render an invoice number from a prefix and sequence value.
/// `("INV", 7)` becomes `INV-0007`; the padding widens past 9999.
pub fn format_invoice_number(prefix: &str, sequence: i64) -> String {
    format!("{}-{:04}", prefix, sequence)
}

/// Input for updating the settings row. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateSettings {
    pub default_currency: Option<super::invoice::Currency>,
    pub default_payment_terms: Option<i32>,
    pub auto_generate_numbers: Option<bool>,
    pub number_prefix: Option<String>,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
    pub enable_reminders: Option<bool>,
    pub reminder_schedule: Option<Vec<i32>>,
    pub enable_late_fees: Option<bool>,
    pub late_fee_percentage: Option<Decimal>,
    pub logo_url: Option<String>,
    pub company_details: Option<Contact>,
}
