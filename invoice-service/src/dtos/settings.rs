//! Settings request DTO.

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::{Contact, Currency, UpdateSettings};

use super::validate_non_negative_amount;

/// Body for `PUT /settings`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    pub default_currency: Option<Currency>,
    #[validate(range(min = 0, max = 365))]
    pub default_payment_terms: Option<i32>,
    pub auto_generate_numbers: Option<bool>,
    #[validate(length(min = 1, max = 10))]
    pub number_prefix: Option<String>,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
    pub enable_reminders: Option<bool>,
    pub reminder_schedule: Option<Vec<i32>>,
    pub enable_late_fees: Option<bool>,
    #[validate(custom(function = validate_non_negative_amount))]
    pub late_fee_percentage: Option<Decimal>,
    pub logo_url: Option<String>,
    pub company_details: Option<Contact>,
}

impl From<UpdateSettingsRequest> for UpdateSettings {
    fn from(req: UpdateSettingsRequest) -> Self {
        UpdateSettings {
            default_currency: req.default_currency,
            default_payment_terms: req.default_payment_terms,
            auto_generate_numbers: req.auto_generate_numbers,
            number_prefix: req.number_prefix,
            default_terms: req.default_terms,
            default_notes: req.default_notes,
            enable_reminders: req.enable_reminders,
            reminder_schedule: req.reminder_schedule,
            enable_late_fees: req.enable_late_fees,
            late_fee_percentage: req.late_fee_percentage,
            logo_url: req.logo_url,
            company_details: req.company_details,
        }
    }
}
