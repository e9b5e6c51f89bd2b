use async_trait::async_trait;

use super::errors::TransactionError;
use super::repository::{AuditLogRepository, OrderItemRepository, OrderRepository};

// ============================================================================
// Unit of Work - Transaction lifecycle + repository hand-out
// ============================================================================
//
// State machine:
//
//   Idle --begin--> InTransaction --commit/rollback--> Idle
//
// - begin while InTransaction        -> AlreadyInTransaction
// - commit/rollback while Idle       -> NoActiveTransaction
//
// Repositories are built on every accessor call from the handle that is
// current at that moment. Do not hold one across a begin/commit boundary:
// a repository built inside a transaction fails with `StaleHandle` once the
// transaction is closed.
//
// One instance serves exactly one logical operation. Build a fresh one per
// call through a `UnitOfWorkFactory`.
//
// ============================================================================

#[async_trait]
pub trait UnitOfWork: Send {
    async fn begin(&mut self) -> Result<(), TransactionError>;

    async fn commit(&mut self) -> Result<(), TransactionError>;

    async fn rollback(&mut self) -> Result<(), TransactionError>;

    fn is_in_transaction(&self) -> bool;

    fn order_repo(&self) -> Box<dyn OrderRepository>;

    fn order_item_repo(&self) -> Box<dyn OrderItemRepository>;

    fn audit_log_repo(&self) -> Box<dyn AuditLogRepository>;
}

pub trait UnitOfWorkFactory: Send + Sync {
    type Uow: UnitOfWork;

    fn create(&self) -> Self::Uow;
}

/// Release whatever transaction is still open on `uow`.
///
/// Meant to run after every transactional body. Once a commit has already
/// closed the transaction this is a no-op.
pub async fn release<U: UnitOfWork + ?Sized>(uow: &mut U) {
    match uow.rollback().await {
        Ok(()) => tracing::warn!("Rolled back unfinished transaction"),
        Err(TransactionError::NoActiveTransaction) => {}
        Err(e) => tracing::error!(error = %e, "Failed to roll back transaction"),
    }
}
