//! Request/response DTOs for the admin HTTP surface.

mod bulk;
mod exports;
mod invoices;
mod payments;
mod recurring;
mod reminders;
mod settings;
mod templates;

pub use bulk::BulkOperationRequest;
pub use exports::{CreateExportRequest, ExportDownloadResponse};
pub use invoices::{
    CreateInvoiceRequest, InvoiceListResponse, InvoiceResponse, ListInvoicesParams, ReasonRequest,
    UpdateInvoiceRequest,
};
pub use payments::{MarkPaidRequest, RecordPaymentRequest};
pub use recurring::CreateRecurringRequest;
pub use reminders::{OverdueReminderOutcome, OverdueReminderReport, SendReminderRequest};
pub use settings::UpdateSettingsRequest;
pub use templates::{CreateTemplateRequest, UpdateTemplateRequest};

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::models::LineItem;

/// Line items must be present and each line must carry a positive quantity
/// and a non-negative unit price.
pub(crate) fn validate_line_items(items: &Vec<LineItem>) -> Result<(), ValidationError> {
    for item in items {
        if item.description.trim().is_empty() {
            return Err(ValidationError::new("line_item_description_required"));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(ValidationError::new("line_item_quantity_not_positive"));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(ValidationError::new("line_item_unit_price_negative"));
        }
    }
    Ok(())
}

pub(crate) fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_not_positive"));
    }
    Ok(())
}

pub(crate) fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(ValidationError::new("amount_negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: &str, unit_price: &str) -> LineItem {
        LineItem {
            description: "Desk booking".to_string(),
            quantity: Decimal::from_str_exact(quantity).unwrap(),
            unit_price: Decimal::from_str_exact(unit_price).unwrap(),
            total: Decimal::ZERO,
            taxes: None,
            discount_percentage: None,
            discount_amount: None,
        }
    }

    #[test]
    fn line_items_require_positive_quantity() {
        assert!(validate_line_items(&vec![item("1", "10")]).is_ok());
        assert!(validate_line_items(&vec![item("0", "10")]).is_err());
        assert!(validate_line_items(&vec![item("-2", "10")]).is_err());
    }

    #[test]
    fn line_items_reject_negative_price() {
        assert!(validate_line_items(&vec![item("1", "0")]).is_ok());
        assert!(validate_line_items(&vec![item("1", "-0.01")]).is_err());
    }

    #[test]
    fn amounts_validate_sign() {
        assert!(validate_positive_amount(&Decimal::ONE).is_ok());
        assert!(validate_positive_amount(&Decimal::ZERO).is_err());
        assert!(validate_non_negative_amount(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative_amount(&Decimal::NEGATIVE_ONE).is_err());
    }
}
