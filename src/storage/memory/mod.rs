// ============================================================================
// In-Memory Backend
// ============================================================================
//
// Same contracts and transactional semantics as the Postgres backend,
// without a server. Used for local runs (STORAGE_BACKEND=memory) and tests.
//
// - Identities come from per-table sequences that, like Postgres sequences,
//   are not rolled back.
// - Inside a transaction, writes land in a pending set visible only to
//   that transaction; commit appends them to the committed tables.
// - Every statement is appended to an operation log for inspection.
//
// ============================================================================

mod repositories;
mod unit_of_work;

pub use repositories::{MemoryAuditLogRepository, MemoryOrderItemRepository, MemoryOrderRepository};
pub use unit_of_work::{MemoryUnitOfWork, MemoryUnitOfWorkFactory};

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;
use crate::storage::records::{AuditLogRecord, OrderItemRecord, OrderRecord};

#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub orders: Vec<OrderRecord>,
    pub items: Vec<OrderItemRecord>,
    pub audit_logs: Vec<AuditLogRecord>,
}

#[derive(Debug, Default)]
struct StoreState {
    committed: Tables,
    last_order_id: i64,
    last_item_id: i64,
    last_audit_id: i64,
    operations: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.committed.orders.len()
    }

    pub async fn item_count(&self) -> usize {
        self.state.lock().await.committed.items.len()
    }

    pub async fn audit_log_count(&self) -> usize {
        self.state.lock().await.committed.audit_logs.len()
    }

    /// Statement log, oldest first (e.g. `orders.bulk_insert`, `tx.commit`).
    pub async fn operations(&self) -> Vec<String> {
        self.state.lock().await.operations.clone()
    }

    pub async fn clear_operations(&self) {
        self.state.lock().await.operations.clear();
    }

    async fn log(&self, operation: &str) {
        self.state.lock().await.operations.push(operation.to_string());
    }

    async fn apply(&self, pending: Tables) {
        let mut state = self.state.lock().await;
        state.committed.orders.extend(pending.orders);
        state.committed.items.extend(pending.items);
        state.committed.audit_logs.extend(pending.audit_logs);
        state.operations.push("tx.commit".to_string());
    }
}

pub(crate) type PendingSlot = Arc<Mutex<Option<Tables>>>;

#[derive(Clone)]
pub(crate) enum MemoryHandle {
    Store,
    Transaction(PendingSlot),
}

/// View over committed rows plus, inside a transaction, its pending rows.
pub struct Scope<'a> {
    state: &'a mut StoreState,
    pending: Option<&'a mut Tables>,
}

impl Scope<'_> {
    pub fn next_order_id(&mut self) -> i64 {
        self.state.last_order_id += 1;
        self.state.last_order_id
    }

    pub fn next_item_id(&mut self) -> i64 {
        self.state.last_item_id += 1;
        self.state.last_item_id
    }

    pub fn next_audit_id(&mut self) -> i64 {
        self.state.last_audit_id += 1;
        self.state.last_audit_id
    }

    pub fn order_exists(&self, id: i64) -> bool {
        self.state.committed.orders.iter().any(|o| o.id == id)
            || self
                .pending
                .as_ref()
                .is_some_and(|p| p.orders.iter().any(|o| o.id == id))
    }

    pub fn item_exists(&self, id: i64) -> bool {
        self.state.committed.items.iter().any(|i| i.id == id)
            || self
                .pending
                .as_ref()
                .is_some_and(|p| p.items.iter().any(|i| i.id == id))
    }

    /// Visible orders in id order.
    pub fn orders(&self) -> Vec<&OrderRecord> {
        let mut rows: Vec<&OrderRecord> = self.state.committed.orders.iter().collect();
        if let Some(pending) = self.pending.as_ref() {
            rows.extend(pending.orders.iter());
        }
        rows.sort_by_key(|o| o.id);
        rows
    }

    pub fn items(&self) -> Vec<&OrderItemRecord> {
        let mut rows: Vec<&OrderItemRecord> = self.state.committed.items.iter().collect();
        if let Some(pending) = self.pending.as_ref() {
            rows.extend(pending.items.iter());
        }
        rows.sort_by_key(|i| i.id);
        rows
    }

    pub fn push_order(&mut self, order: OrderRecord) {
        self.target().orders.push(order);
    }

    pub fn push_item(&mut self, item: OrderItemRecord) {
        self.target().items.push(item);
    }

    pub fn push_audit_log(&mut self, entry: AuditLogRecord) {
        self.target().audit_logs.push(entry);
    }

    fn target(&mut self) -> &mut Tables {
        match &mut self.pending {
            Some(pending) => &mut **pending,
            None => &mut self.state.committed,
        }
    }
}

/// Storage gateway for the in-memory backend.
#[derive(Clone)]
pub struct MemoryExecutor {
    store: MemoryStore,
    handle: MemoryHandle,
}

impl MemoryExecutor {
    pub(crate) fn new(store: MemoryStore, handle: MemoryHandle) -> Self {
        Self { store, handle }
    }

    pub async fn execute<T, F>(&self, operation: &str, write: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<T, StorageError>,
    {
        self.with_scope(operation, write).await
    }

    pub async fn query_one<T, F>(&self, operation: &str, read: F) -> Result<Option<T>, StorageError>
    where
        F: FnOnce(&Scope<'_>) -> Option<T>,
    {
        self.with_scope(operation, |scope| Ok(read(scope))).await
    }

    pub async fn query_many<T, F>(&self, operation: &str, read: F) -> Result<Vec<T>, StorageError>
    where
        F: FnOnce(&Scope<'_>) -> Vec<T>,
    {
        self.with_scope(operation, |scope| Ok(read(scope))).await
    }

    async fn with_scope<T, F>(&self, operation: &str, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<T, StorageError>,
    {
        let mut state = self.store.state.lock().await;
        state.operations.push(operation.to_string());

        match &self.handle {
            MemoryHandle::Store => f(&mut Scope {
                state: &mut *state,
                pending: None,
            }),
            MemoryHandle::Transaction(slot) => {
                let mut guard = slot.lock().await;
                let pending = guard.as_mut().ok_or(StorageError::StaleHandle)?;
                f(&mut Scope {
                    state: &mut *state,
                    pending: Some(pending),
                })
            }
        }
    }
}
