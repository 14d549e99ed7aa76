//! Invoice reminder model. Delivery is an external collaborator; this
//! service records the reminder and audits it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Reminder channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    Email,
    Sms,
    Push,
    Whatsapp,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::Email => "email",
            ReminderType::Sms => "sms",
            ReminderType::Push => "push",
            ReminderType::Whatsapp => "whatsapp",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sms" => ReminderType::Sms,
            "push" => ReminderType::Push,
            "whatsapp" => ReminderType::Whatsapp,
            _ => ReminderType::Email,
        }
    }
}

/// Reminder record for one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub reminder_id: Uuid,
    pub invoice_id: Uuid,
    pub reminder_type: String,
    pub message: Option<String>,
    pub additional_emails: Option<Json<Vec<String>>>,
    pub scheduled_utc: Option<DateTime<Utc>>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub is_sent: bool,
    pub error_message: Option<String>,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a reminder.
#[derive(Debug, Clone)]
pub struct CreateReminder {
    pub reminder_type: ReminderType,
    pub message: Option<String>,
    pub additional_emails: Option<Vec<String>>,
}
