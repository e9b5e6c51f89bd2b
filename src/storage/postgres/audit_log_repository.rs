use async_trait::async_trait;

use super::executor::PgExecutor;
use crate::storage::errors::StorageError;
use crate::storage::records::{AuditLogRecord, NewAuditLog};
use crate::storage::repository::AuditLogRepository;

const INSERT_AUDIT_LOG: &str = "INSERT INTO audit_log_order \
     (order_id, order_item_id, customer_id, order_status) VALUES ($1, $2, $3, $4) \
     RETURNING id, order_id, order_item_id, customer_id, order_status, created_at, updated_at";

pub struct PgAuditLogRepository {
    db: PgExecutor,
}

impl PgAuditLogRepository {
    pub fn new(db: PgExecutor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn create_audit_log(&self, entry: &NewAuditLog) -> Result<AuditLogRecord, StorageError> {
        let record = self
            .db
            .query_one(
                sqlx::query_as::<_, AuditLogRecord>(INSERT_AUDIT_LOG)
                    .bind(entry.order_id)
                    .bind(entry.order_item_id)
                    .bind(entry.customer_id)
                    .bind(&entry.order_status),
            )
            .await?
            .ok_or(StorageError::RowCountMismatch {
                table: "audit_log_order",
                submitted: 1,
                returned: 0,
            })?;

        tracing::debug!(
            audit_id = record.id,
            order_id = record.order_id,
            status = %record.order_status,
            "Inserted audit log entry"
        );
        Ok(record)
    }
}
