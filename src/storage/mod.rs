// ============================================================================
// Storage Layer - Repositories and Unit of Work
// ============================================================================
//
// Backend-neutral contracts live here:
// - records       - row shapes for `orders` / `order_items` / `audit_log_order`
// - errors        - StorageError, TransactionError
// - repository    - OrderRepository, OrderItemRepository, AuditLogRepository
// - unit_of_work  - UnitOfWork, UnitOfWorkFactory
//
// Concrete backends:
// - postgres/     - sqlx over PgPool / Transaction
// - memory/       - in-process tables with the same transactional semantics
//
// ============================================================================

pub mod errors;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod repository;
pub mod unit_of_work;

pub use errors::{StorageError, TransactionError};
pub use records::{
    AuditLogRecord, NewAuditLog, NewOrder, NewOrderItem, OrderFilter, OrderItemFilter, OrderItemRecord, OrderRecord,
    AUDIT_STATUS_CREATED,
};
pub use repository::{AuditLogRepository, OrderItemRepository, OrderRepository};
pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};
