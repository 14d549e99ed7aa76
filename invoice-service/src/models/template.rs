//! Invoice template model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::invoice::{Contact, Currency, LineItem, TaxLine};

/// Reusable field set a template stamps onto generated invoices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_to: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_to: Option<Contact>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxes: Option<Vec<TaxLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<serde_json::Value>,
}

/// Named, typed invoice template. Used both for manual generation and as
/// the blueprint for recurring invoices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceTemplate {
    pub template_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub invoice_type: String,
    pub template_data: Json<TemplateData>,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a template.
#[derive(Debug, Clone)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub invoice_type: super::invoice::InvoiceType,
    pub template_data: TemplateData,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
}

/// Input for updating a template. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_data: Option<TemplateData>,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
    pub is_active: Option<bool>,
}
