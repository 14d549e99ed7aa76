//! Application startup and lifecycle management.

use crate::config::InvoiceConfig;
use crate::handlers;
use crate::services::{get_metrics, init_metrics, Database};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub db: Arc<Database>,
}

/// Health check endpoint for liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "invoice-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "invoice-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Build the admin router over the shared state.
fn admin_router(state: AppState) -> Router {
    Router::new()
        // Invoices
        .route(
            "/invoices",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route("/invoices/bulk", post(handlers::invoices::bulk_operation))
        .route(
            "/invoices/:id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/invoices/:id/send", post(handlers::invoices::send_invoice))
        .route(
            "/invoices/:id/approve",
            post(handlers::invoices::approve_invoice),
        )
        .route(
            "/invoices/:id/reject",
            post(handlers::invoices::reject_invoice),
        )
        .route(
            "/invoices/:id/cancel",
            post(handlers::invoices::cancel_invoice),
        )
        .route("/invoices/:id/void", post(handlers::invoices::void_invoice))
        .route(
            "/invoices/:id/mark-paid",
            post(handlers::invoices::mark_paid),
        )
        .route(
            "/invoices/:id/mark-overdue",
            post(handlers::invoices::mark_overdue),
        )
        .route(
            "/invoices/:id/audit",
            get(handlers::invoices::get_audit_trail),
        )
        // Payments
        .route(
            "/invoices/:id/payments",
            post(handlers::payments::record_payment).get(handlers::payments::list_payments),
        )
        // Reminders
        .route(
            "/invoices/:id/reminders",
            post(handlers::reminders::send_reminder),
        )
        .route(
            "/reminders/overdue",
            post(handlers::reminders::send_overdue_reminders),
        )
        // Templates
        .route(
            "/templates",
            post(handlers::templates::create_template).get(handlers::templates::list_templates),
        )
        .route(
            "/templates/:id",
            put(handlers::templates::update_template).delete(handlers::templates::delete_template),
        )
        // Recurring
        .route(
            "/recurring",
            post(handlers::recurring::create_recurring).get(handlers::recurring::list_recurring),
        )
        .route(
            "/recurring/:id/activate",
            post(handlers::recurring::activate_recurring),
        )
        .route(
            "/recurring/:id/deactivate",
            post(handlers::recurring::deactivate_recurring),
        )
        .route("/recurring/generate", post(handlers::recurring::generate_due))
        // Analytics
        .route("/analytics/summary", get(handlers::analytics::summary))
        .route("/analytics/aging", get(handlers::analytics::aging_report))
        .route(
            "/analytics/revenue-trends",
            get(handlers::analytics::revenue_trends),
        )
        // Exports
        .route("/exports", post(handlers::exports::create_export))
        .route("/exports/:id", get(handlers::exports::get_export))
        .route(
            "/exports/:id/download",
            get(handlers::exports::download_export),
        )
        // Settings
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test
    /// harness.
    pub async fn build_without_migrations(config: InvoiceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: InvoiceConfig, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let state = AppState {
            config: config.clone(),
            db: Arc::new(db),
        };

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Invoice service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
            .merge(admin_router(self.state.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(metrics_middleware))
            .layer(middleware::from_fn(request_id_middleware));

        tracing::info!(
            service = "invoice-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await
    }
}
