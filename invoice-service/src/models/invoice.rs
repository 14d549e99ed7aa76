//! Invoice model and lifecycle guards.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Standard,
    Proforma,
    Recurring,
    CreditNote,
    DebitNote,
    Booking,
    Commission,
    Refund,
    Adjustment,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Standard => "standard",
            InvoiceType::Proforma => "proforma",
            InvoiceType::Recurring => "recurring",
            InvoiceType::CreditNote => "credit_note",
            InvoiceType::DebitNote => "debit_note",
            InvoiceType::Booking => "booking",
            InvoiceType::Commission => "commission",
            InvoiceType::Refund => "refund",
            InvoiceType::Adjustment => "adjustment",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "proforma" => InvoiceType::Proforma,
            "recurring" => InvoiceType::Recurring,
            "credit_note" => InvoiceType::CreditNote,
            "debit_note" => InvoiceType::DebitNote,
            "booking" => InvoiceType::Booking,
            "commission" => InvoiceType::Commission,
            "refund" => InvoiceType::Refund,
            "adjustment" => InvoiceType::Adjustment,
            _ => InvoiceType::Standard,
        }
    }
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Sent,
    Viewed,
    Approved,
    Rejected,
    Paid,
    PartiallyPaid,
    Overdue,
    Cancelled,
    Voided,
    Refunded,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Rejected => "rejected",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Voided => "voided",
            InvoiceStatus::Refunded => "refunded",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "pending" => InvoiceStatus::Pending,
            "sent" => InvoiceStatus::Sent,
            "viewed" => InvoiceStatus::Viewed,
            "approved" => InvoiceStatus::Approved,
            "rejected" => InvoiceStatus::Rejected,
            "paid" => InvoiceStatus::Paid,
            "partially_paid" => InvoiceStatus::PartiallyPaid,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" => InvoiceStatus::Cancelled,
            "voided" => InvoiceStatus::Voided,
            "refunded" => InvoiceStatus::Refunded,
            _ => InvoiceStatus::Draft,
        }
    }

    /// Statuses no further transition may leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Rejected | InvoiceStatus::Cancelled | InvoiceStatus::Voided
        )
    }
}

/// Settlement state, tracked independently of the lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "processing" => PaymentStatus::Processing,
            "completed" => PaymentStatus::Completed,
            "failed" => PaymentStatus::Failed,
            "cancelled" => PaymentStatus::Cancelled,
            "refunded" => PaymentStatus::Refunded,
            "partially_refunded" => PaymentStatus::PartiallyRefunded,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Currency code. Conversion is out of scope; the code is carried as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "USD" => Currency::Usd,
            "EUR" => Currency::Eur,
            "GBP" => Currency::Gbp,
            _ => Currency::Inr,
        }
    }
}

/// Tax category attached to a line or to the invoice as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    Gst,
    Cgst,
    Sgst,
    Igst,
    Cess,
    Tcs,
    Tds,
    Vat,
}

/// Postal address snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Contact snapshot frozen onto the invoice at creation time.
///
/// A snapshot, not a live reference: historical invoices stay stable even
/// if the party record changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// A tax amount applied to a line item or to the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    #[serde(rename = "type")]
    pub tax_type: TaxType,
    pub rate: Decimal,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One billed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Recomputed from quantity, unit price, and per-line discount;
    /// caller-supplied values are ignored.
    #[serde(default)]
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxes: Option<Vec<TaxLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
}

/// Invoice record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub invoice_type: String,
    pub status: String,
    pub payment_status: String,
    pub customer_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub bill_to: Json<Contact>,
    pub ship_to: Option<Json<Contact>>,
    pub items: Json<Vec<LineItem>>,
    pub taxes: Option<Json<Vec<TaxLine>>>,
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
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
    pub pdf_url: Option<String>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub viewed_utc: Option<DateTime<Utc>>,
    pub paid_utc: Option<DateTime<Utc>>,
    pub approved_utc: Option<DateTime<Utc>>,
    pub rejected_utc: Option<DateTime<Utc>>,
    pub cancelled_utc: Option<DateTime<Utc>>,
    pub voided_utc: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub void_reason: Option<String>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub rejected_by: Option<Uuid>,
    pub cancelled_by: Option<Uuid>,
    pub voided_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn status_enum(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }

    pub fn is_draft(&self) -> bool {
        self.status == "draft"
    }

    /// Line items, parties, dates, and amounts may change only here.
    pub fn can_edit(&self) -> bool {
        matches!(
            self.status_enum(),
            InvoiceStatus::Draft | InvoiceStatus::Pending
        )
    }

    pub fn can_cancel(&self) -> bool {
        !matches!(
            self.status_enum(),
            InvoiceStatus::Paid | InvoiceStatus::Cancelled | InvoiceStatus::Voided
        )
    }

    /// Voiding is the stronger override; only an already-voided invoice
    /// refuses it.
    pub fn can_void(&self) -> bool {
        self.status_enum() != InvoiceStatus::Voided
    }

    pub fn is_settled(&self) -> bool {
        self.payment_status == "completed"
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        today > self.due_date && !self.is_settled()
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub invoice_type: Option<InvoiceType>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub issue_date_from: Option<NaiveDate>,
    pub issue_date_to: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_descending: bool,
    pub page: i64,
    pub limit: i64,
}

impl ListInvoicesFilter {
    /// Resolve the sort column against an allowlist; ORDER BY cannot be
    /// bound as a parameter.
    pub fn sort_column(&self) -> &'static str {
        match self.sort_by.as_deref() {
            Some("issue_date") => "issue_date",
            Some("due_date") => "due_date",
            Some("total_amount") => "total_amount",
            Some("invoice_number") => "invoice_number",
            Some("status") => "status",
            _ => "created_utc",
        }
    }

    pub fn sort_direction(&self) -> &'static str {
        if self.sort_descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub invoice_number: Option<String>,
    pub invoice_type: InvoiceType,
    /// Initial status; only `draft` (default) and `pending` are accepted.
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub bill_to: Contact,
    pub ship_to: Option<Contact>,
    pub items: Vec<LineItem>,
    pub taxes: Option<Vec<TaxLine>>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub currency: Option<Currency>,
    pub discount_amount: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub shipping_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
}

/// Input for updating a draft or pending invoice. `None` leaves the field
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub bill_to: Option<Contact>,
    pub ship_to: Option<Contact>,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_with_status(status: &str) -> Invoice {
        Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number: "INV-0001".to_string(),
            invoice_type: "standard".to_string(),
            status: status.to_string(),
            payment_status: "pending".to_string(),
            customer_id: None,
            partner_id: None,
            booking_id: None,
            bill_to: Json(Contact {
                name: "Acme".to_string(),
                email: "billing@acme.test".to_string(),
                phone: None,
                address: None,
            }),
            ship_to: None,
            items: Json(vec![]),
            taxes: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            currency: "INR".to_string(),
            subtotal: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            discount_percentage: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            shipping_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            balance_amount: Decimal::ZERO,
            notes: None,
            terms: None,
            custom_fields: None,
            pdf_url: None,
            sent_utc: None,
            viewed_utc: None,
            paid_utc: None,
            approved_utc: None,
            rejected_utc: None,
            cancelled_utc: None,
            voided_utc: None,
            rejection_reason: None,
            cancellation_reason: None,
            void_reason: None,
            created_by: Uuid::new_v4(),
            updated_by: None,
            approved_by: None,
            rejected_by: None,
            cancelled_by: None,
            voided_by: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn edit_allowed_only_in_draft_and_pending() {
        assert!(invoice_with_status("draft").can_edit());
        assert!(invoice_with_status("pending").can_edit());
        for status in [
            "sent",
            "viewed",
            "approved",
            "rejected",
            "paid",
            "partially_paid",
            "overdue",
            "cancelled",
            "voided",
        ] {
            assert!(!invoice_with_status(status).can_edit(), "status {status}");
        }
    }

    #[test]
    fn cancel_blocked_for_paid_cancelled_voided() {
        for status in ["paid", "cancelled", "voided"] {
            assert!(!invoice_with_status(status).can_cancel(), "status {status}");
        }
        for status in ["draft", "pending", "sent", "approved", "overdue"] {
            assert!(invoice_with_status(status).can_cancel(), "status {status}");
        }
    }

    #[test]
    fn void_blocked_only_when_already_voided() {
        assert!(!invoice_with_status("voided").can_void());
        assert!(invoice_with_status("paid").can_void());
        assert!(invoice_with_status("draft").can_void());
    }

    #[test]
    fn overdue_requires_outstanding_balance() {
        let mut invoice = invoice_with_status("sent");
        let after_due = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert!(invoice.is_overdue(after_due));

        invoice.payment_status = "completed".to_string();
        assert!(!invoice.is_overdue(after_due));

        let before_due = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        invoice.payment_status = "pending".to_string();
        assert!(!invoice.is_overdue(before_due));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Pending,
            InvoiceStatus::Sent,
            InvoiceStatus::Viewed,
            InvoiceStatus::Approved,
            InvoiceStatus::Rejected,
            InvoiceStatus::Paid,
            InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
            InvoiceStatus::Voided,
            InvoiceStatus::Refunded,
        ] {
            assert_eq!(InvoiceStatus::from_string(status.as_str()), status);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(InvoiceStatus::Rejected.is_terminal());
        assert!(InvoiceStatus::Cancelled.is_terminal());
        assert!(InvoiceStatus::Voided.is_terminal());
        assert!(!InvoiceStatus::Paid.is_terminal());
        assert!(!InvoiceStatus::Draft.is_terminal());
    }

    #[test]
    fn sort_column_falls_back_to_created() {
        let mut filter = ListInvoicesFilter::default();
        filter.sort_by = Some("total_amount".to_string());
        assert_eq!(filter.sort_column(), "total_amount");

        filter.sort_by = Some("; DROP TABLE invoices".to_string());
        assert_eq!(filter.sort_column(), "created_utc");
    }
}
