//! Database service for invoice-service.
//!
//! Every guarded transition re-checks its guard against the row locked with
//! `SELECT ... FOR UPDATE` inside the same transaction that persists the
//! mutation and its audit entry. If the audit insert fails the whole
//! transaction rolls back: an un-audited financial mutation is worse than a
//! failed one.

use crate::models::{
    format_invoice_number, AuditAction, AuditEntry, Contact, CreateInvoice, CreatePayment,
    CreateRecurring, CreateReminder, CreateTemplate, ExportFormat, ExportJob, Invoice,
    InvoiceSettings, InvoiceStatus, InvoiceTemplate, ListInvoicesFilter, Payment,
    RecurringInvoice, Reminder, UpdateInvoice, UpdateSettings, UpdateTemplate,
};
use crate::services::amounts;
use crate::services::metrics::{
    DB_QUERY_DURATION, INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL, PAYMENTS_TOTAL, PAYMENT_AMOUNT_TOTAL,
};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::PgConnection;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, invoice_number, invoice_type, status, payment_status, \
    customer_id, partner_id, booking_id, bill_to, ship_to, items, taxes, issue_date, due_date, \
    currency, subtotal, discount_amount, discount_percentage, tax_amount, shipping_amount, \
    total_amount, paid_amount, balance_amount, notes, terms, custom_fields, pdf_url, sent_utc, \
    viewed_utc, paid_utc, approved_utc, rejected_utc, cancelled_utc, voided_utc, rejection_reason, \
    cancellation_reason, void_reason, created_by, updated_by, approved_by, rejected_by, \
    cancelled_by, voided_by, created_utc, updated_utc";

const PAYMENT_COLUMNS: &str =
    "payment_id, invoice_id, amount, method, status, payment_date, reference, notes, recorded_by, \
    created_utc";

const TEMPLATE_COLUMNS: &str = "template_id, name, description, invoice_type, template_data, \
    default_terms, default_notes, is_active, created_by, updated_by, created_utc, updated_utc";

const RECURRING_COLUMNS: &str = "recurring_id, template_id, customer_id, partner_id, frequency, \
    start_date, end_date, max_occurrences, current_occurrences, next_generation_date, is_active, \
    auto_send, created_by, updated_by, created_utc, updated_utc";

const SETTINGS_COLUMNS: &str = "settings_id, default_currency, default_payment_terms, \
    auto_generate_numbers, number_prefix, next_number, default_terms, default_notes, \
    enable_reminders, reminder_schedule, enable_late_fees, late_fee_percentage, logo_url, \
    company_details, updated_by, created_utc, updated_utc";

/// Summary aggregates over the invoice table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvoiceSummary {
    pub total_invoices: i64,
    pub draft_invoices: i64,
    pub pending_invoices: i64,
    pub paid_invoices: i64,
    pub overdue_invoices: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
}

/// One bucket of the receivables aging report.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct AgingBucket {
    pub age_group: String,
    pub invoice_count: i64,
    pub total_amount: Decimal,
}

/// One day of the revenue trend report.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub invoice_count: i64,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Settings and numbering
    // -------------------------------------------------------------------------

    /// Fetch the singleton settings row, creating it with defaults on first
    /// access.
    #[instrument(skip(self))]
    pub async fn get_or_create_settings(&self) -> Result<InvoiceSettings, AppError> {
        let existing = sqlx::query_as::<_, InvoiceSettings>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM invoice_settings LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get settings: {}", e)))?;

        if let Some(settings) = existing {
            return Ok(settings);
        }

        let settings = sqlx::query_as::<_, InvoiceSettings>(&format!(
            "INSERT INTO invoice_settings (settings_id) VALUES ($1)
             ON CONFLICT DO NOTHING
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create settings: {}", e))
        })?;

        match settings {
            Some(settings) => Ok(settings),
            // Lost the insert race; the winner's row is there now.
            None => {
                sqlx::query_as::<_, InvoiceSettings>(&format!(
                    "SELECT {SETTINGS_COLUMNS} FROM invoice_settings LIMIT 1"
                ))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get settings: {}", e))
                })
            }
        }
    }

    /// Update the settings row.
    #[instrument(skip(self, input), fields(actor_id = %actor_id))]
    pub async fn update_settings(
        &self,
        input: &UpdateSettings,
        actor_id: Uuid,
    ) -> Result<InvoiceSettings, AppError> {
        let current = self.get_or_create_settings().await?;

        let settings = sqlx::query_as::<_, InvoiceSettings>(&format!(
            "UPDATE invoice_settings
             SET default_currency = $2,
                 default_payment_terms = $3,
                 auto_generate_numbers = $4,
                 number_prefix = $5,
                 default_terms = COALESCE($6, default_terms),
                 default_notes = COALESCE($7, default_notes),
                 enable_reminders = $8,
                 reminder_schedule = $9,
                 enable_late_fees = $10,
                 late_fee_percentage = $11,
                 logo_url = COALESCE($12, logo_url),
                 company_details = COALESCE($13, company_details),
                 updated_by = $14,
                 updated_utc = NOW()
             WHERE settings_id = $1
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(current.settings_id)
        .bind(
            input
                .default_currency
                .map(|c| c.as_str().to_string())
                .unwrap_or(current.default_currency),
        )
        .bind(
            input
                .default_payment_terms
                .unwrap_or(current.default_payment_terms),
        )
        .bind(
            input
                .auto_generate_numbers
                .unwrap_or(current.auto_generate_numbers),
        )
        .bind(
            input
                .number_prefix
                .clone()
                .unwrap_or(current.number_prefix),
        )
        .bind(&input.default_terms)
        .bind(&input.default_notes)
        .bind(input.enable_reminders.unwrap_or(current.enable_reminders))
        .bind(Json(
            input
                .reminder_schedule
                .clone()
                .unwrap_or(current.reminder_schedule.0),
        ))
        .bind(input.enable_late_fees.unwrap_or(current.enable_late_fees))
        .bind(
            input
                .late_fee_percentage
                .unwrap_or(current.late_fee_percentage),
        )
        .bind(&input.logo_url)
        .bind(input.company_details.clone().map(Json))
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update settings: {}", e))
        })?;

        info!(settings_id = %settings.settings_id, "Invoice settings updated");

        Ok(settings)
    }

    /// Allocate the next invoice number inside `tx`.
    ///
    /// A single-row compare-and-increment: the UPDATE takes the row lock, so
    /// two concurrent creations can never mint the same number.
    async fn allocate_invoice_number(conn: &mut PgConnection) -> Result<String, AppError> {
        let row: (String, i64) = sqlx::query_as(
            "UPDATE invoice_settings
             SET next_number = next_number + 1, updated_utc = NOW()
             RETURNING number_prefix, next_number - 1",
        )
        .fetch_one(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to allocate invoice number: {}", e))
        })?;

        Ok(format_invoice_number(&row.0, row.1))
    }

    // -------------------------------------------------------------------------
    // Audit trail
    // -------------------------------------------------------------------------

    /// Append an audit entry inside the caller's transaction.
    async fn append_audit(
        conn: &mut PgConnection,
        invoice_id: Uuid,
        action: AuditAction,
        description: String,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
        actor_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO invoice_audit_trail
                 (audit_id, invoice_id, action, description, old_values, new_values, performed_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(action.as_str())
        .bind(description)
        .bind(old_values)
        .bind(new_values)
        .bind(actor_id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to append audit entry: {}", e))
        })?;

        Ok(())
    }

    /// List the audit trail for an invoice, oldest first.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn list_audit_trail(&self, invoice_id: Uuid) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT audit_id, invoice_id, action, description, old_values, new_values,
                    performed_by, performed_utc
             FROM invoice_audit_trail
             WHERE invoice_id = $1
             ORDER BY performed_utc, audit_id",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list audit trail: {}", e))
        })?;

        Ok(entries)
    }

    // -------------------------------------------------------------------------
    // Invoice operations
    // -------------------------------------------------------------------------

    /// Lock an invoice row for the remainder of the transaction.
    async fn lock_invoice(
        conn: &mut PgConnection,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE"
        ))
        .bind(invoice_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoice: {}", e)))
    }

    /// Create a new invoice.
    ///
    /// Runs the amount engine over the normalized line items, allocates a
    /// number when none is supplied, and writes the creation audit entry in
    /// the same transaction.
    #[instrument(skip(self, input), fields(actor_id = %actor_id))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let status = match input.status.unwrap_or(InvoiceStatus::Draft) {
            InvoiceStatus::Draft => InvoiceStatus::Draft,
            InvoiceStatus::Pending => InvoiceStatus::Pending,
            other => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Invoices can only be created as draft or pending, not {}",
                    other.as_str()
                )))
            }
        };

        let settings = self.get_or_create_settings().await?;

        let issue_date = input
            .issue_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let due_date = input.due_date.unwrap_or_else(|| {
            issue_date
                .checked_add_days(Days::new(settings.default_payment_terms.max(0) as u64))
                .unwrap_or(issue_date)
        });
        let currency = input
            .currency
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| settings.default_currency.clone());

        let items = amounts::normalize_items(&input.items);
        let discount = input.discount_amount.unwrap_or(Decimal::ZERO);
        let shipping = input.shipping_amount.unwrap_or(Decimal::ZERO);
        let computed = amounts::calculate(
            &items,
            input.taxes.as_deref(),
            discount,
            shipping,
            Decimal::ZERO,
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice_number = match &input.invoice_number {
            Some(number) => number.clone(),
            None => Self::allocate_invoice_number(&mut *tx).await?,
        };

        let invoice_id = Uuid::new_v4();
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "INSERT INTO invoices (
                 invoice_id, invoice_number, invoice_type, status, payment_status,
                 customer_id, partner_id, booking_id, bill_to, ship_to, items, taxes,
                 issue_date, due_date, currency, subtotal, discount_amount,
                 discount_percentage, tax_amount, shipping_amount, total_amount,
                 paid_amount, balance_amount, notes, terms, custom_fields, created_by
             )
             VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, $17, $18, $19, $20, 0, $21, $22, $23, $24, $25)
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(invoice_id)
        .bind(&invoice_number)
        .bind(input.invoice_type.as_str())
        .bind(status.as_str())
        .bind(input.customer_id)
        .bind(input.partner_id)
        .bind(input.booking_id)
        .bind(Json(input.bill_to.clone()))
        .bind(input.ship_to.clone().map(Json))
        .bind(Json(items))
        .bind(input.taxes.clone().map(Json))
        .bind(issue_date)
        .bind(due_date)
        .bind(&currency)
        .bind(computed.subtotal)
        .bind(computed.discount_amount)
        .bind(input.discount_percentage.unwrap_or(Decimal::ZERO))
        .bind(computed.tax_amount)
        .bind(computed.shipping_amount)
        .bind(computed.total_amount)
        .bind(computed.balance_amount)
        .bind(&input.notes)
        .bind(&input.terms)
        .bind(&input.custom_fields)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    invoice_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)),
        })?;

        Self::append_audit(
            &mut *tx,
            invoice.invoice_id,
            AuditAction::Created,
            format!("Invoice {} created", invoice.invoice_number),
            None,
            Some(json!({ "status": invoice.status, "total_amount": invoice.total_amount })),
            actor_id,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        INVOICES_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();
        if let Some(amount) = invoice.total_amount.to_f64() {
            INVOICE_AMOUNT_TOTAL
                .with_label_values(&[invoice.currency.as_str()])
                .inc_by(amount);
        }

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List invoices with filters, sorting, and offset pagination. Returns
    /// the page and the total match count.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<(Vec<Invoice>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.limit.clamp(1, 100);
        let page = filter.page.max(1);
        let offset = (page - 1) * limit;

        let where_clause = "($1::varchar IS NULL OR status = $1)
              AND ($2::varchar IS NULL OR invoice_type = $2)
              AND ($3::varchar IS NULL OR payment_status = $3)
              AND ($4::uuid IS NULL OR customer_id = $4)
              AND ($5::uuid IS NULL OR partner_id = $5)
              AND ($6::uuid IS NULL OR booking_id = $6)
              AND ($7::date IS NULL OR issue_date >= $7)
              AND ($8::date IS NULL OR issue_date <= $8)
              AND ($9::numeric IS NULL OR total_amount >= $9)
              AND ($10::numeric IS NULL OR total_amount <= $10)
              AND ($11::text IS NULL
                   OR invoice_number ILIKE '%' || $11 || '%'
                   OR bill_to->>'name' ILIKE '%' || $11 || '%'
                   OR bill_to->>'email' ILIKE '%' || $11 || '%')";

        let status = filter.status.map(|s| s.as_str().to_string());
        let invoice_type = filter.invoice_type.map(|t| t.as_str().to_string());
        let payment_status = filter.payment_status.map(|s| s.as_str().to_string());

        let query = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices
             WHERE {where_clause}
             ORDER BY {} {}
             LIMIT $12 OFFSET $13",
            filter.sort_column(),
            filter.sort_direction(),
        );

        let invoices = sqlx::query_as::<_, Invoice>(&query)
            .bind(&status)
            .bind(&invoice_type)
            .bind(&payment_status)
            .bind(filter.customer_id)
            .bind(filter.partner_id)
            .bind(filter.booking_id)
            .bind(filter.issue_date_from)
            .bind(filter.issue_date_to)
            .bind(filter.min_amount)
            .bind(filter.max_amount)
            .bind(&filter.search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e))
            })?;

        let count_query = format!("SELECT COUNT(*) FROM invoices WHERE {where_clause}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&status)
            .bind(&invoice_type)
            .bind(&payment_status)
            .bind(filter.customer_id)
            .bind(filter.partner_id)
            .bind(filter.booking_id)
            .bind(filter.issue_date_from)
            .bind(filter.issue_date_to)
            .bind(filter.min_amount)
            .bind(filter.max_amount)
            .bind(&filter.search)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e))
            })?;

        timer.observe_duration();

        Ok((invoices, total))
    }

    /// Update an invoice while it is editable (draft or pending).
    ///
    /// Re-runs the amount engine over the merged line items so the derived
    /// fields stay reconciled.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, actor_id = %actor_id))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        input: &UpdateInvoice,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = Self::lock_invoice(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        if !existing.can_edit() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice cannot be edited in status '{}'",
                existing.status
            )));
        }

        let bill_to: Contact = input
            .bill_to
            .clone()
            .unwrap_or_else(|| existing.bill_to.0.clone());
        let ship_to = input
            .ship_to
            .clone()
            .or_else(|| existing.ship_to.clone().map(|j| j.0));
        let raw_items = input
            .items
            .clone()
            .unwrap_or_else(|| existing.items.0.clone());
        let taxes = input
            .taxes
            .clone()
            .or_else(|| existing.taxes.clone().map(|j| j.0));
        let issue_date = input.issue_date.unwrap_or(existing.issue_date);
        let due_date = input.due_date.unwrap_or(existing.due_date);
        let discount = input.discount_amount.unwrap_or(existing.discount_amount);
        let discount_percentage = input
            .discount_percentage
            .unwrap_or(existing.discount_percentage);
        let shipping = input.shipping_amount.unwrap_or(existing.shipping_amount);

        let items = amounts::normalize_items(&raw_items);
        let computed = amounts::calculate(
            &items,
            taxes.as_deref(),
            discount,
            shipping,
            existing.paid_amount,
        );

        let old_values = json!({
            "items": existing.items.0,
            "subtotal": existing.subtotal,
            "discount_amount": existing.discount_amount,
            "tax_amount": existing.tax_amount,
            "shipping_amount": existing.shipping_amount,
            "total_amount": existing.total_amount,
        });

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "UPDATE invoices
             SET bill_to = $2,
                 ship_to = $3,
                 items = $4,
                 taxes = $5,
                 issue_date = $6,
                 due_date = $7,
                 subtotal = $8,
                 discount_amount = $9,
                 discount_percentage = $10,
                 tax_amount = $11,
                 shipping_amount = $12,
                 total_amount = $13,
                 balance_amount = $14,
                 notes = COALESCE($15, notes),
                 terms = COALESCE($16, terms),
                 custom_fields = COALESCE($17, custom_fields),
                 updated_by = $18,
                 updated_utc = NOW()
             WHERE invoice_id = $1
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(invoice_id)
        .bind(Json(bill_to))
        .bind(ship_to.map(Json))
        .bind(Json(items))
        .bind(taxes.map(Json))
        .bind(issue_date)
        .bind(due_date)
        .bind(computed.subtotal)
        .bind(computed.discount_amount)
        .bind(discount_percentage)
        .bind(computed.tax_amount)
        .bind(computed.shipping_amount)
        .bind(computed.total_amount)
        .bind(computed.balance_amount)
        .bind(&input.notes)
        .bind(&input.terms)
        .bind(&input.custom_fields)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        let new_values = json!({
            "items": invoice.items.0,
            "subtotal": invoice.subtotal,
            "discount_amount": invoice.discount_amount,
            "tax_amount": invoice.tax_amount,
            "shipping_amount": invoice.shipping_amount,
            "total_amount": invoice.total_amount,
        });

        Self::append_audit(
            &mut *tx,
            invoice_id,
            AuditAction::Updated,
            "Invoice updated".to_string(),
            Some(old_values),
            Some(new_values),
            actor_id,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, "Invoice updated");

        Ok(invoice)
    }

    /// Delete a draft invoice. Anything that has left draft is kept for
    /// audit and financial integrity.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, actor_id = %actor_id))]
    pub async fn delete_invoice(&self, invoice_id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = Self::lock_invoice(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        if !existing.is_draft() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Only draft invoices can be deleted"
            )));
        }

        sqlx::query("DELETE FROM invoices WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        Self::append_audit(
            &mut *tx,
            invoice_id,
            AuditAction::Deleted,
            format!("Invoice {} deleted", existing.invoice_number),
            Some(json!({ "status": existing.status })),
            None,
            actor_id,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice_id, "Draft invoice deleted");

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lifecycle transitions
    // -------------------------------------------------------------------------

    /// Shared shape of a guarded transition: lock, re-check guard, mutate,
    /// audit, commit.
    async fn transition(
        &self,
        invoice_id: Uuid,
        actor_id: Uuid,
        action: AuditAction,
        description: impl FnOnce(&Invoice) -> String,
        guard: impl FnOnce(&Invoice) -> Result<(), AppError>,
        update_sql: &str,
        reason: Option<&str>,
    ) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[action.as_str()])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = Self::lock_invoice(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        guard(&existing)?;

        let mut query = sqlx::query_as::<_, Invoice>(update_sql)
            .bind(invoice_id)
            .bind(actor_id);
        if let Some(reason) = reason {
            query = query.bind(reason.to_string());
        }
        let invoice = query.fetch_one(&mut *tx).await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to apply transition: {}", e))
        })?;

        Self::append_audit(
            &mut *tx,
            invoice_id,
            action,
            description(&existing),
            Some(json!({ "status": existing.status })),
            Some(json!({ "status": invoice.status })),
            actor_id,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        INVOICES_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();

        info!(
            invoice_id = %invoice.invoice_id,
            from = %existing.status,
            to = %invoice.status,
            "Invoice transition applied"
        );

        Ok(invoice)
    }

    /// Send an invoice. Only drafts can be sent.
    pub async fn send_invoice(&self, invoice_id: Uuid, actor_id: Uuid) -> Result<Invoice, AppError> {
        self.transition(
            invoice_id,
            actor_id,
            AuditAction::Sent,
            |inv| format!("Invoice {} sent", inv.invoice_number),
            |inv| {
                if inv.status_enum() != InvoiceStatus::Draft {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Only draft invoices can be sent"
                    )));
                }
                Ok(())
            },
            &format!(
                "UPDATE invoices
                 SET status = 'sent', sent_utc = NOW(), updated_by = $2, updated_utc = NOW()
                 WHERE invoice_id = $1
                 RETURNING {INVOICE_COLUMNS}"
            ),
            None,
        )
        .await
    }

    /// Approve a pending invoice.
    pub async fn approve_invoice(
        &self,
        invoice_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        self.transition(
            invoice_id,
            actor_id,
            AuditAction::Approved,
            |inv| format!("Invoice {} approved", inv.invoice_number),
            |inv| {
                if inv.status_enum() != InvoiceStatus::Pending {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Only pending invoices can be approved"
                    )));
                }
                Ok(())
            },
            &format!(
                "UPDATE invoices
                 SET status = 'approved', approved_utc = NOW(), approved_by = $2,
                     updated_by = $2, updated_utc = NOW()
                 WHERE invoice_id = $1
                 RETURNING {INVOICE_COLUMNS}"
            ),
            None,
        )
        .await
    }

    /// Reject a pending invoice. The reason is required.
    pub async fn reject_invoice(
        &self,
        invoice_id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        self.transition(
            invoice_id,
            actor_id,
            AuditAction::Rejected,
            |inv| format!("Invoice {} rejected: {}", inv.invoice_number, reason),
            |inv| {
                if inv.status_enum() != InvoiceStatus::Pending {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Only pending invoices can be rejected"
                    )));
                }
                Ok(())
            },
            &format!(
                "UPDATE invoices
                 SET status = 'rejected', rejected_utc = NOW(), rejected_by = $2,
                     rejection_reason = $3, updated_by = $2, updated_utc = NOW()
                 WHERE invoice_id = $1
                 RETURNING {INVOICE_COLUMNS}"
            ),
            Some(reason),
        )
        .await
    }

    /// Cancel an invoice unless it is paid, cancelled, or voided.
    pub async fn cancel_invoice(
        &self,
        invoice_id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        self.transition(
            invoice_id,
            actor_id,
            AuditAction::Cancelled,
            |inv| format!("Invoice {} cancelled: {}", inv.invoice_number, reason),
            |inv| {
                if !inv.can_cancel() {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Invoice cannot be cancelled in status '{}'",
                        inv.status
                    )));
                }
                Ok(())
            },
            &format!(
                "UPDATE invoices
                 SET status = 'cancelled', cancelled_utc = NOW(), cancelled_by = $2,
                     cancellation_reason = $3, updated_by = $2, updated_utc = NOW()
                 WHERE invoice_id = $1
                 RETURNING {INVOICE_COLUMNS}"
            ),
            Some(reason),
        )
        .await
    }

    /// Void an invoice. The stronger, auditable override: allowed from any
    /// status except an already-voided one, paid included.
    pub async fn void_invoice(
        &self,
        invoice_id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        self.transition(
            invoice_id,
            actor_id,
            AuditAction::Voided,
            |inv| format!("Invoice {} voided: {}", inv.invoice_number, reason),
            |inv| {
                if !inv.can_void() {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Invoice is already voided"
                    )));
                }
                Ok(())
            },
            &format!(
                "UPDATE invoices
                 SET status = 'voided', voided_utc = NOW(), voided_by = $2,
                     void_reason = $3, updated_by = $2, updated_utc = NOW()
                 WHERE invoice_id = $1
                 RETURNING {INVOICE_COLUMNS}"
            ),
            Some(reason),
        )
        .await
    }

    /// Mark an invoice overdue. Job-triggered; only valid while payment is
    /// outstanding and the due date has passed.
    pub async fn mark_overdue(
        &self,
        invoice_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        let today = Utc::now().date_naive();
        self.transition(
            invoice_id,
            actor_id,
            AuditAction::MarkedOverdue,
            |inv| format!("Invoice {} marked overdue", inv.invoice_number),
            move |inv| {
                if inv.is_settled() {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Invoice is already settled"
                    )));
                }
                if matches!(
                    inv.status_enum(),
                    InvoiceStatus::Paid
                        | InvoiceStatus::Overdue
                        | InvoiceStatus::Cancelled
                        | InvoiceStatus::Voided
                        | InvoiceStatus::Rejected
                ) {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Invoice cannot be marked overdue in status '{}'",
                        inv.status
                    )));
                }
                if inv.due_date >= today {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Invoice is not past its due date"
                    )));
                }
                Ok(())
            },
            &format!(
                "UPDATE invoices
                 SET status = 'overdue', updated_by = $2, updated_utc = NOW()
                 WHERE invoice_id = $1
                 RETURNING {INVOICE_COLUMNS}"
            ),
            None,
        )
        .await
    }

    /// Invoices past their due date that are not settled and not already
    /// terminal, for the overdue-marking and reminder passes.
    #[instrument(skip(self))]
    pub async fn list_overdue_candidates(&self, today: NaiveDate) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices
             WHERE due_date < $1
               AND payment_status <> 'completed'
               AND status NOT IN ('paid', 'cancelled', 'voided', 'rejected', 'draft')
             ORDER BY due_date"
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list overdue invoices: {}", e))
        })?;

        Ok(invoices)
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Record a payment against an invoice.
    ///
    /// The invoice row is locked for the duration, so two concurrent partial
    /// payments that together exceed the balance cannot both pass the
    /// overpayment check. Settlement (`balance <= 0`) flips `payment_status`
    /// and `status` to paid atomically in the same transaction.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, actor_id = %actor_id))]
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        input: &CreatePayment,
        actor_id: Uuid,
    ) -> Result<(Payment, Invoice), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        if input.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount must be greater than zero"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = Self::lock_invoice(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        if matches!(
            invoice.status_enum(),
            InvoiceStatus::Cancelled | InvoiceStatus::Voided | InvoiceStatus::Rejected
        ) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payments cannot be recorded against a {} invoice",
                invoice.status
            )));
        }

        if invoice.balance_amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice is already settled"
            )));
        }

        if input.amount > invoice.balance_amount {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount {} exceeds balance amount {}",
                input.amount,
                invoice.balance_amount
            )));
        }

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO invoice_payments
                 (payment_id, invoice_id, amount, method, status, payment_date, reference,
                  notes, recorded_by)
             VALUES ($1, $2, $3, $4, 'completed', $5, $6, $7, $8)
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(input.amount)
        .bind(input.method.as_str())
        .bind(input.payment_date)
        .bind(&input.reference)
        .bind(&input.notes)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))?;

        let new_paid = invoice.paid_amount + input.amount;
        let computed = amounts::calculate(
            &invoice.items.0,
            invoice.taxes.as_ref().map(|j| j.0.as_slice()),
            invoice.discount_amount,
            invoice.shipping_amount,
            new_paid,
        );

        let settled = computed.balance_amount <= Decimal::ZERO;
        let (payment_status, status) = if settled {
            ("completed", "paid")
        } else {
            ("processing", "partially_paid")
        };

        let updated = sqlx::query_as::<_, Invoice>(&format!(
            "UPDATE invoices
             SET paid_amount = $2,
                 balance_amount = $3,
                 payment_status = $4,
                 status = $5,
                 paid_utc = CASE WHEN $6 THEN NOW() ELSE paid_utc END,
                 updated_by = $7,
                 updated_utc = NOW()
             WHERE invoice_id = $1
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(invoice_id)
        .bind(computed.paid_amount)
        .bind(computed.balance_amount)
        .bind(payment_status)
        .bind(status)
        .bind(settled)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        Self::append_audit(
            &mut *tx,
            invoice_id,
            AuditAction::PaymentRecorded,
            format!(
                "Payment of {} recorded via {}",
                input.amount,
                input.method.as_str()
            ),
            Some(json!({
                "paid_amount": invoice.paid_amount,
                "balance_amount": invoice.balance_amount,
                "payment_status": invoice.payment_status,
            })),
            Some(json!({
                "paid_amount": updated.paid_amount,
                "balance_amount": updated.balance_amount,
                "payment_status": updated.payment_status,
            })),
            actor_id,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        PAYMENTS_TOTAL
            .with_label_values(&[input.method.as_str()])
            .inc();
        if let Some(amount) = input.amount.to_f64() {
            PAYMENT_AMOUNT_TOTAL
                .with_label_values(&[updated.currency.as_str()])
                .inc_by(amount);
        }

        info!(
            payment_id = %payment.payment_id,
            invoice_id = %invoice_id,
            amount = %payment.amount,
            settled = settled,
            "Payment recorded"
        );

        Ok((payment, updated))
    }

    /// Settle an invoice by recording its outstanding balance as a closing
    /// payment.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, actor_id = %actor_id))]
    pub async fn mark_paid(
        &self,
        invoice_id: Uuid,
        input: &CreatePayment,
        actor_id: Uuid,
    ) -> Result<Invoice, AppError> {
        let invoice = self
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        let closing = CreatePayment {
            amount: invoice.balance_amount,
            method: input.method,
            payment_date: input.payment_date,
            reference: input.reference.clone(),
            notes: input.notes.clone(),
        };

        // record_payment re-locks and re-validates against the fresh row.
        let (_, updated) = self.record_payment(invoice_id, &closing, actor_id).await?;
        Ok(updated)
    }

    /// List payments for an invoice, newest first.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM invoice_payments
             WHERE invoice_id = $1
             ORDER BY created_utc DESC"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        Ok(payments)
    }

    // -------------------------------------------------------------------------
    // Templates
    // -------------------------------------------------------------------------

    /// Create a template.
    #[instrument(skip(self, input), fields(actor_id = %actor_id))]
    pub async fn create_template(
        &self,
        input: &CreateTemplate,
        actor_id: Uuid,
    ) -> Result<InvoiceTemplate, AppError> {
        let template = sqlx::query_as::<_, InvoiceTemplate>(&format!(
            "INSERT INTO invoice_templates
                 (template_id, name, description, invoice_type, template_data, default_terms,
                  default_notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.invoice_type.as_str())
        .bind(Json(input.template_data.clone()))
        .bind(&input.default_terms)
        .bind(&input.default_notes)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create template: {}", e))
        })?;

        info!(template_id = %template.template_id, name = %template.name, "Template created");

        Ok(template)
    }

    /// Get a template by ID.
    pub async fn get_template(
        &self,
        template_id: Uuid,
    ) -> Result<Option<InvoiceTemplate>, AppError> {
        let template = sqlx::query_as::<_, InvoiceTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM invoice_templates WHERE template_id = $1"
        ))
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get template: {}", e)))?;

        Ok(template)
    }

    /// List templates, newest first.
    #[instrument(skip(self))]
    pub async fn list_templates(&self, active_only: bool) -> Result<Vec<InvoiceTemplate>, AppError> {
        let templates = sqlx::query_as::<_, InvoiceTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM invoice_templates
             WHERE ($1::bool = FALSE OR is_active = TRUE)
             ORDER BY created_utc DESC"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list templates: {}", e)))?;

        Ok(templates)
    }

    /// Update a template.
    #[instrument(skip(self, input), fields(template_id = %template_id, actor_id = %actor_id))]
    pub async fn update_template(
        &self,
        template_id: Uuid,
        input: &UpdateTemplate,
        actor_id: Uuid,
    ) -> Result<InvoiceTemplate, AppError> {
        let template = sqlx::query_as::<_, InvoiceTemplate>(&format!(
            "UPDATE invoice_templates
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 template_data = COALESCE($4, template_data),
                 default_terms = COALESCE($5, default_terms),
                 default_notes = COALESCE($6, default_notes),
                 is_active = COALESCE($7, is_active),
                 updated_by = $8,
                 updated_utc = NOW()
             WHERE template_id = $1
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(template_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.template_data.clone().map(Json))
        .bind(&input.default_terms)
        .bind(&input.default_notes)
        .bind(input.is_active)
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update template: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

        Ok(template)
    }

    /// Delete a template.
    #[instrument(skip(self), fields(template_id = %template_id))]
    pub async fn delete_template(&self, template_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM invoice_templates WHERE template_id = $1")
            .bind(template_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete template: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Template not found")));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Recurring invoices
    // -------------------------------------------------------------------------

    /// Create a recurring invoice schedule. The first generation is due on
    /// the start date.
    #[instrument(skip(self, input), fields(actor_id = %actor_id))]
    pub async fn create_recurring(
        &self,
        input: &CreateRecurring,
        actor_id: Uuid,
    ) -> Result<RecurringInvoice, AppError> {
        self.get_template(input.template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

        let recurring = sqlx::query_as::<_, RecurringInvoice>(&format!(
            "INSERT INTO recurring_invoices
                 (recurring_id, template_id, customer_id, partner_id, frequency, start_date,
                  end_date, max_occurrences, next_generation_date, is_active, auto_send,
                  created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $6, $9, $10, $11)
             RETURNING {RECURRING_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.template_id)
        .bind(input.customer_id)
        .bind(input.partner_id)
        .bind(input.frequency.as_str())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.max_occurrences)
        .bind(input.is_active)
        .bind(input.auto_send)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create recurring invoice: {}", e))
        })?;

        info!(
            recurring_id = %recurring.recurring_id,
            frequency = %recurring.frequency,
            "Recurring invoice created"
        );

        Ok(recurring)
    }

    /// Get a recurring schedule by ID.
    pub async fn get_recurring(
        &self,
        recurring_id: Uuid,
    ) -> Result<Option<RecurringInvoice>, AppError> {
        let recurring = sqlx::query_as::<_, RecurringInvoice>(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_invoices WHERE recurring_id = $1"
        ))
        .bind(recurring_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get recurring invoice: {}", e))
        })?;

        Ok(recurring)
    }

    /// List recurring schedules, newest first.
    #[instrument(skip(self))]
    pub async fn list_recurring(&self) -> Result<Vec<RecurringInvoice>, AppError> {
        let recurring = sqlx::query_as::<_, RecurringInvoice>(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_invoices ORDER BY created_utc DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list recurring invoices: {}", e))
        })?;

        Ok(recurring)
    }

    /// Activate or deactivate a recurring schedule.
    #[instrument(skip(self), fields(recurring_id = %recurring_id, actor_id = %actor_id))]
    pub async fn set_recurring_active(
        &self,
        recurring_id: Uuid,
        is_active: bool,
        actor_id: Uuid,
    ) -> Result<RecurringInvoice, AppError> {
        let recurring = sqlx::query_as::<_, RecurringInvoice>(&format!(
            "UPDATE recurring_invoices
             SET is_active = $2, updated_by = $3, updated_utc = NOW()
             WHERE recurring_id = $1
             RETURNING {RECURRING_COLUMNS}"
        ))
        .bind(recurring_id)
        .bind(is_active)
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update recurring invoice: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Recurring invoice not found")))?;

        info!(
            recurring_id = %recurring.recurring_id,
            is_active = recurring.is_active,
            "Recurring invoice state changed"
        );

        Ok(recurring)
    }

    /// Active schedules whose next generation date has arrived.
    #[instrument(skip(self))]
    pub async fn list_due_recurring(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<RecurringInvoice>, AppError> {
        let due = sqlx::query_as::<_, RecurringInvoice>(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_invoices
             WHERE is_active = TRUE
               AND next_generation_date <= $1
               AND (end_date IS NULL OR end_date >= $1)
               AND (max_occurrences IS NULL OR current_occurrences < max_occurrences)
             ORDER BY next_generation_date"
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list due recurring: {}", e))
        })?;

        Ok(due)
    }

    /// Advance a schedule after a successful generation: bump the occurrence
    /// count, move the next generation date one period forward, and
    /// deactivate the record once exhausted.
    #[instrument(skip(self), fields(recurring_id = %recurring_id))]
    pub async fn advance_recurring(
        &self,
        recurring_id: Uuid,
        next_generation_date: NaiveDate,
        deactivate: bool,
    ) -> Result<RecurringInvoice, AppError> {
        let recurring = sqlx::query_as::<_, RecurringInvoice>(&format!(
            "UPDATE recurring_invoices
             SET current_occurrences = current_occurrences + 1,
                 next_generation_date = $2,
                 is_active = CASE WHEN $3 THEN FALSE ELSE is_active END,
                 updated_utc = NOW()
             WHERE recurring_id = $1
             RETURNING {RECURRING_COLUMNS}"
        ))
        .bind(recurring_id)
        .bind(next_generation_date)
        .bind(deactivate)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance recurring: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Recurring invoice not found")))?;

        Ok(recurring)
    }

    // -------------------------------------------------------------------------
    // Reminders
    // -------------------------------------------------------------------------

    /// Record a reminder for an invoice and audit it. Delivery itself is an
    /// external collaborator; the record is marked sent here.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, actor_id = %actor_id))]
    pub async fn create_reminder(
        &self,
        invoice_id: Uuid,
        input: &CreateReminder,
        actor_id: Uuid,
    ) -> Result<Reminder, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = Self::lock_invoice(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        let reminder = sqlx::query_as::<_, Reminder>(
            "INSERT INTO invoice_reminders
                 (reminder_id, invoice_id, reminder_type, message, additional_emails,
                  sent_utc, is_sent, created_by)
             VALUES ($1, $2, $3, $4, $5, NOW(), TRUE, $6)
             RETURNING reminder_id, invoice_id, reminder_type, message, additional_emails,
                 scheduled_utc, sent_utc, is_sent, error_message, created_by, created_utc",
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(input.reminder_type.as_str())
        .bind(&input.message)
        .bind(input.additional_emails.clone().map(Json))
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create reminder: {}", e))
        })?;

        Self::append_audit(
            &mut *tx,
            invoice_id,
            AuditAction::ReminderSent,
            format!(
                "Reminder sent for invoice {} via {}",
                invoice.invoice_number,
                input.reminder_type.as_str()
            ),
            None,
            Some(json!({ "reminder_type": input.reminder_type.as_str() })),
            actor_id,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        Ok(reminder)
    }

    // -------------------------------------------------------------------------
    // Exports
    // -------------------------------------------------------------------------

    /// Create an export job. The count is captured up front; rendering and
    /// upload belong to an external collaborator, which reports back through
    /// the download URL.
    #[instrument(skip(self, filters), fields(actor_id = %actor_id))]
    pub async fn create_export(
        &self,
        format: ExportFormat,
        filters: Option<serde_json::Value>,
        actor_id: Uuid,
    ) -> Result<ExportJob, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e))
            })?;

        let export_id = Uuid::new_v4();
        let job = sqlx::query_as::<_, ExportJob>(
            "INSERT INTO invoice_exports
                 (export_id, status, format, filters, total_records, requested_by, expires_utc)
             VALUES ($1, 'processing', $2, $3, $4, $5, NOW() + INTERVAL '7 days')
             RETURNING export_id, status, format, filters, total_records, processed_records,
                 download_url, error_message, requested_by, completed_utc, expires_utc,
                 created_utc",
        )
        .bind(export_id)
        .bind(format.as_str())
        .bind(filters)
        .bind(total as i32)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create export: {}", e)))?;

        info!(export_id = %job.export_id, format = %job.format, "Export job created");

        Ok(job)
    }

    /// Get an export job by ID.
    pub async fn get_export(&self, export_id: Uuid) -> Result<Option<ExportJob>, AppError> {
        let job = sqlx::query_as::<_, ExportJob>(
            "SELECT export_id, status, format, filters, total_records, processed_records,
                 download_url, error_message, requested_by, completed_utc, expires_utc,
                 created_utc
             FROM invoice_exports
             WHERE export_id = $1",
        )
        .bind(export_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get export: {}", e)))?;

        Ok(job)
    }

    /// Mark an export completed with its download URL.
    #[instrument(skip(self), fields(export_id = %export_id))]
    pub async fn complete_export(
        &self,
        export_id: Uuid,
        download_url: &str,
    ) -> Result<ExportJob, AppError> {
        let job = sqlx::query_as::<_, ExportJob>(
            "UPDATE invoice_exports
             SET status = 'completed', processed_records = total_records,
                 download_url = $2, completed_utc = NOW()
             WHERE export_id = $1
             RETURNING export_id, status, format, filters, total_records, processed_records,
                 download_url, error_message, requested_by, completed_utc, expires_utc,
                 created_utc",
        )
        .bind(export_id)
        .bind(download_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to complete export: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Export not found")))?;

        Ok(job)
    }

    // -------------------------------------------------------------------------
    // Analytics
    // -------------------------------------------------------------------------

    /// Aggregate counts and totals over the invoice table.
    #[instrument(skip(self))]
    pub async fn invoice_summary(&self) -> Result<InvoiceSummary, AppError> {
        let row: (i64, i64, i64, i64, i64, Decimal, Decimal) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'draft'),
                    COUNT(*) FILTER (WHERE status = 'pending'),
                    COUNT(*) FILTER (WHERE status = 'paid'),
                    COUNT(*) FILTER (WHERE status = 'overdue'),
                    COALESCE(SUM(total_amount), 0),
                    COALESCE(SUM(paid_amount), 0)
             FROM invoices
             WHERE status NOT IN ('cancelled', 'voided')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute summary: {}", e))
        })?;

        Ok(InvoiceSummary {
            total_invoices: row.0,
            draft_invoices: row.1,
            pending_invoices: row.2,
            paid_invoices: row.3,
            overdue_invoices: row.4,
            total_amount: row.5,
            paid_amount: row.6,
            outstanding_amount: row.5 - row.6,
        })
    }

    /// Receivables aging buckets over unsettled, past-due invoices.
    #[instrument(skip(self))]
    pub async fn aging_report(&self, today: NaiveDate) -> Result<Vec<AgingBucket>, AppError> {
        let buckets = sqlx::query_as::<_, AgingBucket>(
            "SELECT CASE
                        WHEN $1 - due_date <= 30 THEN '0-30'
                        WHEN $1 - due_date <= 60 THEN '31-60'
                        WHEN $1 - due_date <= 90 THEN '61-90'
                        ELSE '90+'
                    END AS age_group,
                    COUNT(*) AS invoice_count,
                    COALESCE(SUM(balance_amount), 0) AS total_amount
             FROM invoices
             WHERE due_date < $1
               AND payment_status <> 'completed'
               AND status NOT IN ('cancelled', 'voided', 'rejected', 'draft')
             GROUP BY age_group
             ORDER BY age_group",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute aging report: {}", e))
        })?;

        Ok(buckets)
    }

    /// Daily paid revenue between two dates.
    #[instrument(skip(self))]
    pub async fn revenue_trends(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<RevenuePoint>, AppError> {
        let points = sqlx::query_as::<_, RevenuePoint>(
            "SELECT issue_date AS date,
                    COALESCE(SUM(total_amount), 0) AS revenue,
                    COUNT(*) AS invoice_count
             FROM invoices
             WHERE status = 'paid'
               AND issue_date BETWEEN $1 AND $2
             GROUP BY issue_date
             ORDER BY issue_date",
        )
        .bind(date_from)
        .bind(date_to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute revenue trends: {}", e))
        })?;

        Ok(points)
    }
}
