//! Invoice request/response DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Contact, CreateInvoice, Currency, Invoice, InvoiceStatus, InvoiceType, LineItem,
    ListInvoicesFilter, PaymentStatus, TaxLine, UpdateInvoice,
};

use super::{validate_line_items, validate_non_negative_amount};

fn default_limit() -> i64 {
    10
}

fn default_page() -> i64 {
    1
}

/// Body for `POST /invoices`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub invoice_type: Option<InvoiceType>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub bill_to: Contact,
    pub ship_to: Option<Contact>,
    #[validate(
        length(min = 1, message = "At least one line item is required"),
        custom(function = validate_line_items)
    )]
    pub items: Vec<LineItem>,
    pub taxes: Option<Vec<TaxLine>>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub currency: Option<Currency>,
    #[validate(custom(function = validate_non_negative_amount))]
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    #[validate(custom(function = validate_non_negative_amount))]
    #[serde(default)]
    pub shipping_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
}

impl From<CreateInvoiceRequest> for CreateInvoice {
    fn from(req: CreateInvoiceRequest) -> Self {
        CreateInvoice {
            invoice_number: req.invoice_number,
            invoice_type: req.invoice_type.unwrap_or(InvoiceType::Standard),
            status: req.status,
            customer_id: req.customer_id,
            partner_id: req.partner_id,
            booking_id: req.booking_id,
            bill_to: req.bill_to,
            ship_to: req.ship_to,
            items: req.items,
            taxes: req.taxes,
            issue_date: req.issue_date,
            due_date: req.due_date,
            currency: req.currency,
            discount_amount: req.discount_amount,
            discount_percentage: req.discount_percentage,
            shipping_amount: req.shipping_amount,
            notes: req.notes,
            terms: req.terms,
            custom_fields: req.custom_fields,
        }
    }
}

/// Body for `PUT /invoices/:id`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub bill_to: Option<Contact>,
    pub ship_to: Option<Contact>,
    #[validate(custom(function = validate_update_items))]
    pub items: Option<Vec<LineItem>>,
    pub taxes: Option<Vec<TaxLine>>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub discount_amount: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub shipping_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
}

fn validate_update_items(items: &Vec<LineItem>) -> Result<(), validator::ValidationError> {
    if items.is_empty() {
        return Err(validator::ValidationError::new("line_items_empty"));
    }
    validate_line_items(items)
}

impl From<UpdateInvoiceRequest> for UpdateInvoice {
    fn from(req: UpdateInvoiceRequest) -> Self {
        UpdateInvoice {
            bill_to: req.bill_to,
            ship_to: req.ship_to,
            items: req.items,
            taxes: req.taxes,
            issue_date: req.issue_date,
            due_date: req.due_date,
            discount_amount: req.discount_amount,
            discount_percentage: req.discount_percentage,
            shipping_amount: req.shipping_amount,
            notes: req.notes,
            terms: req.terms,
            custom_fields: req.custom_fields,
        }
    }
}

/// Body for reject/cancel/void transitions, which all require a reason.
#[derive(Debug, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(length(min = 1, message = "A reason is required"))]
    pub reason: String,
}

/// Query parameters for `GET /invoices`.
#[derive(Debug, Deserialize)]
pub struct ListInvoicesParams {
    pub status: Option<InvoiceStatus>,
    #[serde(rename = "type")]
    pub invoice_type: Option<InvoiceType>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl From<ListInvoicesParams> for ListInvoicesFilter {
    fn from(params: ListInvoicesParams) -> Self {
        let sort_descending = !matches!(params.sort_order.as_deref(), Some("asc") | Some("ASC"));
        ListInvoicesFilter {
            status: params.status,
            invoice_type: params.invoice_type,
            payment_status: params.payment_status,
            customer_id: params.customer_id,
            partner_id: params.partner_id,
            booking_id: params.booking_id,
            issue_date_from: params.date_from,
            issue_date_to: params.date_to,
            min_amount: params.min_amount,
            max_amount: params.max_amount,
            search: params.search,
            sort_by: params.sort_by,
            sort_descending,
            page: params.page,
            limit: params.limit,
        }
    }
}

/// Invoice as returned by the API.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    #[serde(rename = "type")]
    pub invoice_type: String,
    pub status: String,
    pub payment_status: String,
    pub customer_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub bill_to: Contact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_to: Option<Contact>,
    pub items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxes: Option<Vec<TaxLine>>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub discount_percentage: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub void_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        InvoiceResponse {
            id: invoice.invoice_id,
            invoice_number: invoice.invoice_number,
            invoice_type: invoice.invoice_type,
            status: invoice.status,
            payment_status: invoice.payment_status,
            customer_id: invoice.customer_id,
            partner_id: invoice.partner_id,
            booking_id: invoice.booking_id,
            bill_to: invoice.bill_to.0,
            ship_to: invoice.ship_to.map(|j| j.0),
            items: invoice.items.0,
            taxes: invoice.taxes.map(|j| j.0),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            currency: invoice.currency,
            subtotal: invoice.subtotal,
            discount_amount: invoice.discount_amount,
            discount_percentage: invoice.discount_percentage,
            tax_amount: invoice.tax_amount,
            shipping_amount: invoice.shipping_amount,
            total_amount: invoice.total_amount,
            paid_amount: invoice.paid_amount,
            balance_amount: invoice.balance_amount,
            notes: invoice.notes,
            terms: invoice.terms,
            custom_fields: invoice.custom_fields,
            pdf_url: invoice.pdf_url,
            sent_at: invoice.sent_utc,
            viewed_at: invoice.viewed_utc,
            paid_at: invoice.paid_utc,
            approved_at: invoice.approved_utc,
            rejected_at: invoice.rejected_utc,
            cancelled_at: invoice.cancelled_utc,
            voided_at: invoice.voided_utc,
            rejection_reason: invoice.rejection_reason,
            cancellation_reason: invoice.cancellation_reason,
            void_reason: invoice.void_reason,
            created_by: invoice.created_by,
            created_at: invoice.created_utc,
            updated_at: invoice.updated_utc,
        }
    }
}

/// Paged invoice listing.
#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl InvoiceListResponse {
    pub fn new(invoices: Vec<Invoice>, total: i64, page: i64, limit: i64) -> Self {
        let limit = limit.max(1);
        Self {
            invoices: invoices.into_iter().map(InvoiceResponse::from).collect(),
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}
