use async_trait::async_trait;
use chrono::Utc;

use super::{MemoryExecutor, Scope};
use crate::storage::errors::StorageError;
use crate::storage::records::{
    paginate, AuditLogRecord, NewAuditLog, NewOrder, NewOrderItem, OrderFilter, OrderItemFilter, OrderItemRecord,
    OrderRecord,
};
use crate::storage::repository::{AuditLogRepository, OrderItemRepository, OrderRepository};

// ============================================================================
// Order Repository
// ============================================================================

pub struct MemoryOrderRepository {
    db: MemoryExecutor,
}

impl MemoryOrderRepository {
    pub fn new(db: MemoryExecutor) -> Self {
        Self { db }
    }
}

fn insert_order(scope: &mut Scope<'_>, order: &NewOrder) -> OrderRecord {
    let now = Utc::now();
    let record = OrderRecord {
        id: scope.next_order_id(),
        customer_id: order.customer_id,
        delivery_address: order.delivery_address.clone(),
        total_price_cents: order.total_price_cents,
        total_price_currency: order.total_price_currency.clone(),
        created_at: now,
        updated_at: now,
    };
    scope.push_order(record.clone());
    record
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderRecord, StorageError> {
        self.db
            .execute("orders.insert", |scope| Ok(insert_order(scope, order)))
            .await
    }

    async fn bulk_insert_orders(&self, orders: &[NewOrder]) -> Result<Vec<OrderRecord>, StorageError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        self.db
            .execute("orders.bulk_insert", |scope| {
                Ok(orders.iter().map(|order| insert_order(scope, order)).collect())
            })
            .await
    }

    async fn get_order_by_id(&self, id: i64) -> Result<OrderRecord, StorageError> {
        self.db
            .query_one("orders.select_by_id", |scope| {
                scope.orders().into_iter().find(|o| o.id == id).cloned()
            })
            .await?
            .ok_or(StorageError::NotFound { entity: "order", id })
    }

    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>, StorageError> {
        self.db
            .query_many("orders.select", |scope| {
                let matching: Vec<OrderRecord> = scope
                    .orders()
                    .into_iter()
                    .filter(|o| filter.matches(o))
                    .cloned()
                    .collect();
                paginate(matching, filter.limit, filter.offset)
            })
            .await
    }
}

// ============================================================================
// Order Item Repository
// ============================================================================

pub struct MemoryOrderItemRepository {
    db: MemoryExecutor,
}

impl MemoryOrderItemRepository {
    pub fn new(db: MemoryExecutor) -> Self {
        Self { db }
    }
}

/// Mirrors the `order_items` FK and CHECK constraints.
fn check_item(scope: &Scope<'_>, item: &NewOrderItem) -> Result<(), StorageError> {
    if !scope.order_exists(item.order_id) {
        return Err(StorageError::Constraint(format!(
            "order_items.order_id {} references no order",
            item.order_id
        )));
    }
    if item.quantity <= 0 {
        return Err(StorageError::Constraint(format!(
            "order_items.quantity must be positive, got {}",
            item.quantity
        )));
    }
    Ok(())
}

fn insert_item(scope: &mut Scope<'_>, item: &NewOrderItem) -> OrderItemRecord {
    let now = Utc::now();
    let record = OrderItemRecord {
        id: scope.next_item_id(),
        order_id: item.order_id,
        product_id: item.product_id,
        quantity: item.quantity,
        product_title: item.product_title.clone(),
        product_url: item.product_url.clone(),
        price_cents: item.price_cents,
        price_currency: item.price_currency.clone(),
        created_at: now,
        updated_at: now,
    };
    scope.push_item(record.clone());
    record
}

#[async_trait]
impl OrderItemRepository for MemoryOrderItemRepository {
    async fn create_order_item(&self, item: &NewOrderItem) -> Result<OrderItemRecord, StorageError> {
        self.db
            .execute("order_items.insert", |scope| {
                check_item(scope, item)?;
                Ok(insert_item(scope, item))
            })
            .await
    }

    async fn bulk_insert_order_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItemRecord>, StorageError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        self.db
            .execute("order_items.bulk_insert", |scope| {
                // A statement is all-or-nothing: check every row before writing any.
                for item in items {
                    check_item(scope, item)?;
                }
                Ok(items.iter().map(|item| insert_item(scope, item)).collect())
            })
            .await
    }

    async fn get_order_items_by_order_id(&self, order_id: i64) -> Result<Vec<OrderItemRecord>, StorageError> {
        self.db
            .query_many("order_items.select_by_order", |scope| {
                scope
                    .items()
                    .into_iter()
                    .filter(|i| i.order_id == order_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    async fn query_order_items(&self, filter: &OrderItemFilter) -> Result<Vec<OrderItemRecord>, StorageError> {
        self.db
            .query_many("order_items.select", |scope| {
                let matching: Vec<OrderItemRecord> = scope
                    .items()
                    .into_iter()
                    .filter(|i| filter.matches(i))
                    .cloned()
                    .collect();
                paginate(matching, filter.limit, filter.offset)
            })
            .await
    }
}

// ============================================================================
// Audit Log Repository
// ============================================================================

pub struct MemoryAuditLogRepository {
    db: MemoryExecutor,
}

impl MemoryAuditLogRepository {
    pub fn new(db: MemoryExecutor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLogRepository for MemoryAuditLogRepository {
    async fn create_audit_log(&self, entry: &NewAuditLog) -> Result<AuditLogRecord, StorageError> {
        self.db
            .execute("audit_log_order.insert", |scope| {
                if !scope.order_exists(entry.order_id) {
                    return Err(StorageError::Constraint(format!(
                        "audit_log_order.order_id {} references no order",
                        entry.order_id
                    )));
                }
                if !scope.item_exists(entry.order_item_id) {
                    return Err(StorageError::Constraint(format!(
                        "audit_log_order.order_item_id {} references no order item",
                        entry.order_item_id
                    )));
                }

                let now = Utc::now();
                let record = AuditLogRecord {
                    id: scope.next_audit_id(),
                    order_id: entry.order_id,
                    order_item_id: entry.order_item_id,
                    customer_id: entry.customer_id,
                    order_status: entry.order_status.clone(),
                    created_at: now,
                    updated_at: now,
                };
                scope.push_audit_log(record.clone());
                Ok(record)
            })
            .await
    }
}
