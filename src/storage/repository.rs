use async_trait::async_trait;

use super::errors::StorageError;
use super::records::{
    AuditLogRecord, NewAuditLog, NewOrder, NewOrderItem, OrderFilter, OrderItemFilter, OrderItemRecord, OrderRecord,
};

// ============================================================================
// Repository Contracts
// ============================================================================
//
// Repositories never own a storage handle. Each backend builds them from
// whatever handle its Unit of Work currently exposes (pool or transaction).
//
// ============================================================================

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert one order header and return the persisted row.
    async fn create_order(&self, order: &NewOrder) -> Result<OrderRecord, StorageError>;

    /// Insert all headers in one round trip.
    ///
    /// The returned rows are in the same order as `orders`; callers rely on
    /// position to re-associate generated identities.
    async fn bulk_insert_orders(&self, orders: &[NewOrder]) -> Result<Vec<OrderRecord>, StorageError>;

    /// Point lookup. A missing row is `StorageError::NotFound`.
    async fn get_order_by_id(&self, id: i64) -> Result<OrderRecord, StorageError>;

    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>, StorageError>;
}

#[async_trait]
pub trait OrderItemRepository: Send + Sync {
    async fn create_order_item(&self, item: &NewOrderItem) -> Result<OrderItemRecord, StorageError>;

    async fn bulk_insert_order_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItemRecord>, StorageError>;

    async fn get_order_items_by_order_id(&self, order_id: i64) -> Result<Vec<OrderItemRecord>, StorageError>;

    async fn query_order_items(&self, filter: &OrderItemFilter) -> Result<Vec<OrderItemRecord>, StorageError>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one audit row; the referenced order and item must exist.
    async fn create_audit_log(&self, entry: &NewAuditLog) -> Result<AuditLogRecord, StorageError>;
}
