//! Payment request DTOs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::{CreatePayment, PaymentMethod};

use super::validate_positive_amount;

/// Body for `POST /invoices/:id/payments`.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(custom(function = validate_positive_amount))]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl RecordPaymentRequest {
    pub fn into_create(self, today: NaiveDate) -> CreatePayment {
        CreatePayment {
            amount: self.amount,
            method: self.method,
            payment_date: self.payment_date.unwrap_or(today),
            reference: self.reference,
            notes: self.notes,
        }
    }
}

/// Body for `POST /invoices/:id/mark-paid`. The amount is always the
/// outstanding balance; only the payment metadata is caller-supplied.
#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidRequest {
    pub method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl MarkPaidRequest {
    pub fn into_create(self, today: NaiveDate) -> CreatePayment {
        CreatePayment {
            amount: Decimal::ZERO, // replaced by the outstanding balance
            method: self.method.unwrap_or(PaymentMethod::Other),
            payment_date: self.payment_date.unwrap_or(today),
            reference: self.reference,
            notes: self.notes,
        }
    }
}
