// ============================================================================
// Postgres Backend (sqlx)
// ============================================================================

mod audit_log_repository;
mod executor;
mod order_item_repository;
mod order_repository;
mod schema;
mod unit_of_work;

pub use audit_log_repository::PgAuditLogRepository;
pub use executor::{DbHandle, PgExecutor};
pub use order_item_repository::PgOrderItemRepository;
pub use order_repository::PgOrderRepository;
pub use schema::ensure_schema;
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkFactory};

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::DbSettings;
use crate::storage::errors::StorageError;
use crate::utils::{retry_on_transient, RetryConfig};

/// Open the connection pool, retrying transient connect failures.
pub async fn connect(settings: &DbSettings) -> Result<PgPool, StorageError> {
    let pool = retry_on_transient(RetryConfig::startup(), |attempt| {
        let url = settings.connection_string.clone();
        let max_connections = settings.max_connections;
        async move {
            tracing::debug!(attempt, "Connecting to Postgres");
            PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&url)
                .await
        }
    })
    .await
    .into_result()?;

    tracing::info!(
        database = %settings.masked_connection_string(),
        max_connections = settings.max_connections,
        "Connected to Postgres"
    );
    Ok(pool)
}
