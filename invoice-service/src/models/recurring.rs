//! Recurring invoice model and generation cadence.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Generation cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl RecurrenceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceFrequency::Daily => "daily",
            RecurrenceFrequency::Weekly => "weekly",
            RecurrenceFrequency::Monthly => "monthly",
            RecurrenceFrequency::Quarterly => "quarterly",
            RecurrenceFrequency::Yearly => "yearly",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "daily" => RecurrenceFrequency::Daily,
            "weekly" => RecurrenceFrequency::Weekly,
            "quarterly" => RecurrenceFrequency::Quarterly,
            "yearly" => RecurrenceFrequency::Yearly,
            _ => RecurrenceFrequency::Monthly,
        }
    }

    /// Advance a date by exactly one period.
    ///
    /// Month and year steps use calendar-aware addition: the day is clamped
    /// to the end of the target month (Jan 31 + 1 month lands on the last
    /// day of February), never rolled over into an invalid date.
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        let next = match self {
            RecurrenceFrequency::Daily => date.checked_add_days(Days::new(1)),
            RecurrenceFrequency::Weekly => date.checked_add_days(Days::new(7)),
            RecurrenceFrequency::Monthly => date.checked_add_months(Months::new(1)),
            RecurrenceFrequency::Quarterly => date.checked_add_months(Months::new(3)),
            RecurrenceFrequency::Yearly => date.checked_add_months(Months::new(12)),
        };
        // Only reachable at the far edge of the supported date range.
        next.unwrap_or(date)
    }
}

/// Recurring invoice record: a schedule that materializes invoices from a
/// template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurringInvoice {
    pub recurring_id: Uuid,
    pub template_id: Uuid,
    pub customer_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_occurrences: Option<i32>,
    pub current_occurrences: i32,
    pub next_generation_date: NaiveDate,
    pub is_active: bool,
    pub auto_send: bool,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl RecurringInvoice {
    pub fn frequency_enum(&self) -> RecurrenceFrequency {
        RecurrenceFrequency::from_string(&self.frequency)
    }

    /// Whether a generation is due as of `today`.
    pub fn should_generate(&self, today: NaiveDate) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(end) = self.end_date {
            if today > end {
                return false;
            }
        }
        if let Some(max) = self.max_occurrences {
            if self.current_occurrences >= max {
                return false;
            }
        }
        today >= self.next_generation_date
    }

    /// Whether the schedule is exhausted after the occurrence that was just
    /// generated.
    pub fn is_exhausted(&self, today: NaiveDate) -> bool {
        if let Some(max) = self.max_occurrences {
            if self.current_occurrences >= max {
                return true;
            }
        }
        if let Some(end) = self.end_date {
            if self.next_generation_date > end || today > end {
                return true;
            }
        }
        false
    }
}

/// Input for creating a recurring invoice.
#[derive(Debug, Clone)]
pub struct CreateRecurring {
    pub template_id: Uuid,
    pub customer_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub frequency: RecurrenceFrequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_occurrences: Option<i32>,
    pub is_active: bool,
    pub auto_send: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_and_weekly_advance_by_days() {
        assert_eq!(
            RecurrenceFrequency::Daily.advance(date(2024, 2, 28)),
            date(2024, 2, 29)
        );
        assert_eq!(
            RecurrenceFrequency::Weekly.advance(date(2024, 12, 30)),
            date(2025, 1, 6)
        );
    }

    #[test]
    fn monthly_advance_clamps_to_month_end() {
        // Leap year: Jan 31 -> Feb 29, not Mar 2.
        assert_eq!(
            RecurrenceFrequency::Monthly.advance(date(2024, 1, 31)),
            date(2024, 2, 29)
        );
        // Non-leap year: Jan 31 -> Feb 28.
        assert_eq!(
            RecurrenceFrequency::Monthly.advance(date(2025, 1, 31)),
            date(2025, 2, 28)
        );
        assert_eq!(
            RecurrenceFrequency::Monthly.advance(date(2024, 3, 31)),
            date(2024, 4, 30)
        );
    }

    #[test]
    fn quarterly_advance_spans_year_boundary() {
        assert_eq!(
            RecurrenceFrequency::Quarterly.advance(date(2024, 11, 30)),
            date(2025, 2, 28)
        );
        assert_eq!(
            RecurrenceFrequency::Quarterly.advance(date(2024, 1, 15)),
            date(2024, 4, 15)
        );
    }

    #[test]
    fn yearly_advance_handles_leap_day() {
        assert_eq!(
            RecurrenceFrequency::Yearly.advance(date(2024, 2, 29)),
            date(2025, 2, 28)
        );
        assert_eq!(
            RecurrenceFrequency::Yearly.advance(date(2024, 6, 1)),
            date(2025, 6, 1)
        );
    }

    fn recurring(next: NaiveDate) -> RecurringInvoice {
        RecurringInvoice {
            recurring_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            partner_id: None,
            frequency: "monthly".to_string(),
            start_date: date(2024, 1, 1),
            end_date: None,
            max_occurrences: None,
            current_occurrences: 0,
            next_generation_date: next,
            is_active: true,
            auto_send: false,
            created_by: Uuid::new_v4(),
            updated_by: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn should_generate_when_due_and_active() {
        let record = recurring(date(2024, 3, 1));
        assert!(record.should_generate(date(2024, 3, 1)));
        assert!(record.should_generate(date(2024, 3, 15)));
        assert!(!record.should_generate(date(2024, 2, 28)));
    }

    #[test]
    fn should_not_generate_when_inactive() {
        let mut record = recurring(date(2024, 3, 1));
        record.is_active = false;
        assert!(!record.should_generate(date(2024, 3, 1)));
    }

    #[test]
    fn should_not_generate_past_end_date() {
        let mut record = recurring(date(2024, 3, 1));
        record.end_date = Some(date(2024, 2, 28));
        assert!(!record.should_generate(date(2024, 3, 1)));
    }

    #[test]
    fn should_not_generate_at_max_occurrences() {
        let mut record = recurring(date(2024, 3, 1));
        record.max_occurrences = Some(3);
        record.current_occurrences = 3;
        assert!(!record.should_generate(date(2024, 3, 1)));

        record.current_occurrences = 2;
        assert!(record.should_generate(date(2024, 3, 1)));
    }

    #[test]
    fn exhausted_after_final_occurrence() {
        let mut record = recurring(date(2024, 3, 1));
        record.max_occurrences = Some(2);
        record.current_occurrences = 2;
        assert!(record.is_exhausted(date(2024, 3, 1)));

        let mut record = recurring(date(2024, 4, 1));
        record.end_date = Some(date(2024, 3, 15));
        assert!(record.is_exhausted(date(2024, 3, 1)));
    }
}
