//! Services module for invoice-service.

pub mod amounts;
pub mod bulk;
pub mod database;
pub mod metrics;
pub mod scheduler;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
