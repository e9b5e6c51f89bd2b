use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::repositories::{MemoryAuditLogRepository, MemoryOrderItemRepository, MemoryOrderRepository};
use super::{MemoryExecutor, MemoryHandle, MemoryStore, PendingSlot, Tables};
use crate::storage::errors::TransactionError;
use crate::storage::repository::{AuditLogRepository, OrderItemRepository, OrderRepository};
use crate::storage::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

pub struct MemoryUnitOfWork {
    store: MemoryStore,
    tx: Option<PendingSlot>,
}

impl MemoryUnitOfWork {
    pub fn new(store: MemoryStore) -> Self {
        Self { store, tx: None }
    }

    fn executor(&self) -> MemoryExecutor {
        let handle = match &self.tx {
            Some(slot) => MemoryHandle::Transaction(slot.clone()),
            None => MemoryHandle::Store,
        };
        MemoryExecutor::new(self.store.clone(), handle)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn begin(&mut self) -> Result<(), TransactionError> {
        if self.tx.is_some() {
            return Err(TransactionError::AlreadyInTransaction);
        }

        self.tx = Some(Arc::new(Mutex::new(Some(Tables::default()))));
        self.store.log("tx.begin").await;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), TransactionError> {
        let slot = self.tx.take().ok_or(TransactionError::NoActiveTransaction)?;
        let pending = slot.lock().await.take().ok_or(TransactionError::NoActiveTransaction)?;

        self.store.apply(pending).await;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), TransactionError> {
        let slot = self.tx.take().ok_or(TransactionError::NoActiveTransaction)?;
        slot.lock().await.take().ok_or(TransactionError::NoActiveTransaction)?;

        self.store.log("tx.rollback").await;
        Ok(())
    }

    fn is_in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    fn order_repo(&self) -> Box<dyn OrderRepository> {
        Box::new(MemoryOrderRepository::new(self.executor()))
    }

    fn order_item_repo(&self) -> Box<dyn OrderItemRepository> {
        Box::new(MemoryOrderItemRepository::new(self.executor()))
    }

    fn audit_log_repo(&self) -> Box<dyn AuditLogRepository> {
        Box::new(MemoryAuditLogRepository::new(self.executor()))
    }
}

#[derive(Clone, Default)]
pub struct MemoryUnitOfWorkFactory {
    store: MemoryStore,
}

impl MemoryUnitOfWorkFactory {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

impl UnitOfWorkFactory for MemoryUnitOfWorkFactory {
    type Uow = MemoryUnitOfWork;

    fn create(&self) -> MemoryUnitOfWork {
        MemoryUnitOfWork::new(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::errors::StorageError;
    use crate::storage::records::{NewAuditLog, NewOrder, NewOrderItem, OrderFilter, OrderItemFilter};

    fn new_order(customer_id: i64) -> NewOrder {
        NewOrder {
            customer_id,
            delivery_address: "221B Baker Street".to_string(),
            total_price_cents: 1000,
            total_price_currency: "USD".to_string(),
        }
    }

    fn new_item(order_id: i64, product_id: i64) -> NewOrderItem {
        NewOrderItem {
            order_id,
            product_id,
            quantity: 2,
            product_title: "Widget".to_string(),
            product_url: "https://shop.example.com/widget".to_string(),
            price_cents: 500,
            price_currency: "USD".to_string(),
        }
    }

    #[tokio::test]
    async fn test_double_begin_fails_with_state_error() {
        let mut uow = MemoryUnitOfWork::new(MemoryStore::new());

        uow.begin().await.unwrap();
        let second = uow.begin().await;

        assert!(matches!(second, Err(TransactionError::AlreadyInTransaction)));
        assert!(uow.is_in_transaction());
    }

    #[tokio::test]
    async fn test_commit_and_rollback_on_idle_fail_with_state_error() {
        let mut uow = MemoryUnitOfWork::new(MemoryStore::new());

        assert!(matches!(uow.commit().await, Err(TransactionError::NoActiveTransaction)));
        assert!(matches!(uow.rollback().await, Err(TransactionError::NoActiveTransaction)));
    }

    #[tokio::test]
    async fn test_rollback_after_commit_keeps_committed_rows() {
        let store = MemoryStore::new();
        let mut uow = MemoryUnitOfWork::new(store.clone());

        uow.begin().await.unwrap();
        uow.order_repo().create_order(&new_order(1)).await.unwrap();
        uow.commit().await.unwrap();

        assert!(matches!(uow.rollback().await, Err(TransactionError::NoActiveTransaction)));
        assert_eq!(store.order_count().await, 1);
        assert!(!uow.is_in_transaction());
    }

    #[tokio::test]
    async fn test_rollback_discards_pending_writes() {
        let store = MemoryStore::new();
        let mut uow = MemoryUnitOfWork::new(store.clone());

        uow.begin().await.unwrap();
        let order = uow.order_repo().create_order(&new_order(1)).await.unwrap();
        uow.order_item_repo()
            .create_order_item(&new_item(order.id, 10))
            .await
            .unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_pending_writes_are_invisible_outside_the_transaction() {
        let store = MemoryStore::new();
        let mut writer = MemoryUnitOfWork::new(store.clone());
        let reader = MemoryUnitOfWork::new(store.clone());

        writer.begin().await.unwrap();
        let order = writer.order_repo().create_order(&new_order(1)).await.unwrap();

        let inside = writer.order_repo().get_order_by_id(order.id).await;
        let outside = reader.order_repo().get_order_by_id(order.id).await;

        assert!(inside.is_ok());
        assert!(matches!(outside, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_repository_from_closed_transaction_reports_stale_handle() {
        let mut uow = MemoryUnitOfWork::new(MemoryStore::new());

        uow.begin().await.unwrap();
        let stale = uow.order_repo();
        uow.commit().await.unwrap();

        let result = stale.create_order(&new_order(1)).await;
        assert!(matches!(result, Err(StorageError::StaleHandle)));

        // A freshly obtained repository targets the store again.
        assert!(uow.order_repo().create_order(&new_order(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_insert_preserves_submission_order() {
        let uow = MemoryUnitOfWork::new(MemoryStore::new());
        let input: Vec<NewOrder> = (1..=5).map(new_order).collect();

        let inserted = uow.order_repo().bulk_insert_orders(&input).await.unwrap();

        let customers: Vec<i64> = inserted.iter().map(|o| o.customer_id).collect();
        assert_eq!(customers, vec![1, 2, 3, 4, 5]);
        assert!(inserted.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_get_order_by_id_missing_is_not_found() {
        let uow = MemoryUnitOfWork::new(MemoryStore::new());

        let result = uow.order_repo().get_order_by_id(99).await;
        assert!(matches!(result, Err(StorageError::NotFound { entity: "order", id: 99 })));
    }

    #[tokio::test]
    async fn test_query_orders_filters_and_paginates() {
        let uow = MemoryUnitOfWork::new(MemoryStore::new());
        let repo = uow.order_repo();
        repo.bulk_insert_orders(&[new_order(1), new_order(2), new_order(1), new_order(1)])
            .await
            .unwrap();

        let filter = OrderFilter {
            customer_ids: vec![1],
            limit: Some(2),
            offset: Some(1),
            ..OrderFilter::default()
        };
        let page = repo.query_orders(&filter).await.unwrap();

        let ids: Vec<i64> = page.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_item_insert_enforces_parent_reference() {
        let uow = MemoryUnitOfWork::new(MemoryStore::new());

        let result = uow.order_item_repo().create_order_item(&new_item(404, 1)).await;
        assert!(matches!(result, Err(StorageError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_bulk_item_insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        let uow = MemoryUnitOfWork::new(store.clone());
        let order = uow.order_repo().create_order(&new_order(1)).await.unwrap();

        let result = uow
            .order_item_repo()
            .bulk_insert_order_items(&[new_item(order.id, 1), new_item(404, 2)])
            .await;

        assert!(result.is_err());
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_query_order_items_by_owning_orders() {
        let uow = MemoryUnitOfWork::new(MemoryStore::new());
        let orders = uow
            .order_repo()
            .bulk_insert_orders(&[new_order(1), new_order(2), new_order(3)])
            .await
            .unwrap();
        let items = uow.order_item_repo();
        items
            .bulk_insert_order_items(&[
                new_item(orders[0].id, 1),
                new_item(orders[1].id, 2),
                new_item(orders[2].id, 3),
                new_item(orders[0].id, 4),
            ])
            .await
            .unwrap();

        let found = items
            .query_order_items(&OrderItemFilter::for_orders(vec![orders[0].id, orders[2].id]))
            .await
            .unwrap();
        let products: Vec<i64> = found.iter().map(|i| i.product_id).collect();
        assert_eq!(products, vec![1, 3, 4]);

        let by_order = items.get_order_items_by_order_id(orders[1].id).await.unwrap();
        assert_eq!(by_order.len(), 1);
        assert_eq!(by_order[0].product_id, 2);
    }

    #[tokio::test]
    async fn test_audit_rows_follow_the_transaction_outcome() {
        let store = MemoryStore::new();
        let mut uow = MemoryUnitOfWork::new(store.clone());

        uow.begin().await.unwrap();
        let order = uow.order_repo().create_order(&new_order(7)).await.unwrap();
        let item = uow
            .order_item_repo()
            .create_order_item(&new_item(order.id, 1))
            .await
            .unwrap();
        let entry = uow
            .audit_log_repo()
            .create_audit_log(&NewAuditLog::created(&order, &item))
            .await
            .unwrap();
        assert_eq!(entry.order_status, "Created");
        assert_eq!(entry.customer_id, 7);
        uow.rollback().await.unwrap();

        assert_eq!(store.audit_log_count().await, 0);

        uow.begin().await.unwrap();
        let order = uow.order_repo().create_order(&new_order(7)).await.unwrap();
        let item = uow
            .order_item_repo()
            .create_order_item(&new_item(order.id, 1))
            .await
            .unwrap();
        uow.audit_log_repo()
            .create_audit_log(&NewAuditLog::created(&order, &item))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.audit_log_count().await, 1);
    }

    #[tokio::test]
    async fn test_audit_log_requires_existing_item() {
        let uow = MemoryUnitOfWork::new(MemoryStore::new());
        let order = uow.order_repo().create_order(&new_order(1)).await.unwrap();

        let entry = NewAuditLog {
            order_id: order.id,
            order_item_id: 404,
            customer_id: 1,
            order_status: "Created".to_string(),
        };
        let result = uow.audit_log_repo().create_audit_log(&entry).await;

        assert!(matches!(result, Err(StorageError::Constraint(_))));
    }
}
