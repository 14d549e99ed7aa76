//! Recurring invoice request DTOs.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateRecurring, RecurrenceFrequency};

fn default_active() -> bool {
    true
}

/// Body for `POST /recurring`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecurringRequest {
    pub template_id: Uuid,
    pub customer_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub frequency: RecurrenceFrequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub max_occurrences: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub auto_send: bool,
}

impl From<CreateRecurringRequest> for CreateRecurring {
    fn from(req: CreateRecurringRequest) -> Self {
        CreateRecurring {
            template_id: req.template_id,
            customer_id: req.customer_id,
            partner_id: req.partner_id,
            frequency: req.frequency,
            start_date: req.start_date,
            end_date: req.end_date,
            max_occurrences: req.max_occurrences,
            is_active: req.is_active,
            auto_send: req.auto_send,
        }
    }
}
