use std::time::Duration;

// ============================================================================
// Storage Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("transaction handle is no longer active")]
    StaleHandle,

    #[error("bulk insert into {table} returned {returned} rows for {submitted} submitted")]
    RowCountMismatch {
        table: &'static str,
        submitted: usize,
        returned: usize,
    },

    #[error("constraint violated: {0}")]
    Constraint(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Unit of Work lifecycle failures.
///
/// `AlreadyInTransaction` and `NoActiveTransaction` are state misuse;
/// `Storage` wraps a failure of the store itself while opening or closing
/// a transaction.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("a transaction is already active on this unit of work")]
    AlreadyInTransaction,

    #[error("no active transaction on this unit of work")]
    NoActiveTransaction,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TransactionError {
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            TransactionError::AlreadyInTransaction | TransactionError::NoActiveTransaction
        )
    }
}
