//! Domain models for invoice-service.

mod audit;
mod bulk;
mod export;
mod invoice;
mod payment;
mod recurring;
mod reminder;
mod settings;
mod template;

pub use audit::{AuditAction, AuditEntry};
pub use bulk::{BulkItemOutcome, BulkOperation, BulkReport};
pub use export::{ExportFormat, ExportJob, ExportStatus};
pub use invoice::{
    Address, Contact, CreateInvoice, Currency, Invoice, InvoiceStatus, InvoiceType, LineItem,
    ListInvoicesFilter, PaymentStatus, TaxLine, TaxType, UpdateInvoice,
};
pub use payment::{CreatePayment, Payment, PaymentMethod};
pub use recurring::{CreateRecurring, RecurrenceFrequency, RecurringInvoice};
pub use reminder::{CreateReminder, Reminder, ReminderType};
pub use settings::{format_invoice_number, InvoiceSettings, UpdateSettings};
pub use template::{CreateTemplate, InvoiceTemplate, TemplateData, UpdateTemplate};
