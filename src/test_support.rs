//! Fault injection for service tests: a publisher that fails at a given
//! event and a unit of work whose item inserts or commit can be made to fail.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::messaging::{EventPublisher, PublishError};
use crate::models::DomainEvent;
use crate::storage::memory::{MemoryStore, MemoryUnitOfWork};
use crate::storage::{
    AuditLogRepository, NewOrderItem, OrderItemFilter, OrderItemRecord, OrderItemRepository, OrderRepository,
    StorageError, TransactionError, UnitOfWork, UnitOfWorkFactory,
};

/// Accepts events before `fail_at` and rejects the one at that index.
pub struct FailingPublisher {
    fail_at: usize,
}

impl FailingPublisher {
    pub fn at_index(fail_at: usize) -> Self {
        Self { fail_at }
    }
}

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish<E>(&self, events: &[E], destination: &str, _correlation_id: Uuid) -> Result<(), PublishError>
    where
        E: DomainEvent + Serialize + Sync,
    {
        if events.len() > self.fail_at {
            return Err(PublishError::Delivery {
                index: self.fail_at,
                destination: destination.to_string(),
                reason: "broker rejected message".into(),
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FaultInjectingFactory {
    store: MemoryStore,
    fail_item_insert_at: Option<usize>,
    fail_commit: bool,
}

impl FaultInjectingFactory {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            fail_item_insert_at: None,
            fail_commit: false,
        }
    }

    /// Fail the n-th (zero-based) item insert of each unit of work.
    pub fn fail_item_insert_at(mut self, n: usize) -> Self {
        self.fail_item_insert_at = Some(n);
        self
    }

    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }
}

impl UnitOfWorkFactory for FaultInjectingFactory {
    type Uow = FaultInjectingUnitOfWork;

    fn create(&self) -> FaultInjectingUnitOfWork {
        FaultInjectingUnitOfWork {
            inner: MemoryUnitOfWork::new(self.store.clone()),
            item_inserts: Arc::new(AtomicUsize::new(0)),
            fail_item_insert_at: self.fail_item_insert_at,
            fail_commit: self.fail_commit,
        }
    }
}

pub struct FaultInjectingUnitOfWork {
    inner: MemoryUnitOfWork,
    item_inserts: Arc<AtomicUsize>,
    fail_item_insert_at: Option<usize>,
    fail_commit: bool,
}

#[async_trait]
impl UnitOfWork for FaultInjectingUnitOfWork {
    async fn begin(&mut self) -> Result<(), TransactionError> {
        self.inner.begin().await
    }

    async fn commit(&mut self) -> Result<(), TransactionError> {
        if self.fail_commit {
            // The handle is consumed even though the commit fails.
            self.inner.rollback().await?;
            return Err(TransactionError::Storage(StorageError::Timeout(Duration::from_secs(30))));
        }
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), TransactionError> {
        self.inner.rollback().await
    }

    fn is_in_transaction(&self) -> bool {
        self.inner.is_in_transaction()
    }

    fn order_repo(&self) -> Box<dyn OrderRepository> {
        self.inner.order_repo()
    }

    fn order_item_repo(&self) -> Box<dyn OrderItemRepository> {
        Box::new(FaultInjectingItemRepository {
            inner: self.inner.order_item_repo(),
            item_inserts: self.item_inserts.clone(),
            fail_at: self.fail_item_insert_at,
        })
    }

    fn audit_log_repo(&self) -> Box<dyn AuditLogRepository> {
        self.inner.audit_log_repo()
    }
}

struct FaultInjectingItemRepository {
    inner: Box<dyn OrderItemRepository>,
    item_inserts: Arc<AtomicUsize>,
    fail_at: Option<usize>,
}

#[async_trait]
impl OrderItemRepository for FaultInjectingItemRepository {
    async fn create_order_item(&self, item: &NewOrderItem) -> Result<OrderItemRecord, StorageError> {
        let n = self.item_inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(n) {
            return Err(StorageError::Constraint("injected item insert failure".into()));
        }
        self.inner.create_order_item(item).await
    }

    async fn bulk_insert_order_items(&self, items: &[NewOrderItem]) -> Result<Vec<OrderItemRecord>, StorageError> {
        self.inner.bulk_insert_order_items(items).await
    }

    async fn get_order_items_by_order_id(&self, order_id: i64) -> Result<Vec<OrderItemRecord>, StorageError> {
        self.inner.get_order_items_by_order_id(order_id).await
    }

    async fn query_order_items(&self, filter: &OrderItemFilter) -> Result<Vec<OrderItemRecord>, StorageError> {
        self.inner.query_order_items(filter).await
    }
}
