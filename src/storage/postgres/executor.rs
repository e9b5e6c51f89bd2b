use sqlx::postgres::{PgArguments, PgPool, PgRow, Postgres};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, Transaction};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;

// ============================================================================
// Postgres Storage Gateway
// ============================================================================
//
// One capability surface (execute / query_one / query_many) over two
// handle variants:
// - Pool        - autocommit statements on a pooled connection
// - Transaction - statements inside the Unit of Work's open transaction
//
// The transaction slot is shared with the Unit of Work. Commit/rollback take
// the transaction out of the slot, so a gateway that outlives its
// transaction reports `StaleHandle` instead of writing outside it.
//
// ============================================================================

pub(crate) type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

#[derive(Clone)]
pub enum DbHandle {
    Pool(PgPool),
    Transaction(SharedTransaction),
}

#[derive(Clone)]
pub struct PgExecutor {
    handle: DbHandle,
    statement_timeout: Duration,
}

impl PgExecutor {
    pub fn new(handle: DbHandle, statement_timeout: Duration) -> Self {
        Self {
            handle,
            statement_timeout,
        }
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self.handle, DbHandle::Transaction(_))
    }

    /// Run a statement that returns no rows; yields the affected row count.
    pub async fn execute<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> Result<u64, StorageError> {
        self.bounded(async {
            let result = match &self.handle {
                DbHandle::Pool(pool) => query.execute(pool).await?,
                DbHandle::Transaction(slot) => {
                    let mut guard = slot.lock().await;
                    let tx = guard.as_mut().ok_or(StorageError::StaleHandle)?;
                    query.execute(&mut **tx).await?
                }
            };
            Ok(result.rows_affected())
        })
        .await
    }

    /// Fetch at most one row.
    pub async fn query_one<'q, O>(
        &self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Option<O>, StorageError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        self.bounded(async {
            let row = match &self.handle {
                DbHandle::Pool(pool) => query.fetch_optional(pool).await?,
                DbHandle::Transaction(slot) => {
                    let mut guard = slot.lock().await;
                    let tx = guard.as_mut().ok_or(StorageError::StaleHandle)?;
                    query.fetch_optional(&mut **tx).await?
                }
            };
            Ok(row)
        })
        .await
    }

    pub async fn query_many<'q, O>(
        &self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Vec<O>, StorageError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        self.bounded(async {
            let rows = match &self.handle {
                DbHandle::Pool(pool) => query.fetch_all(pool).await?,
                DbHandle::Transaction(slot) => {
                    let mut guard = slot.lock().await;
                    let tx = guard.as_mut().ok_or(StorageError::StaleHandle)?;
                    query.fetch_all(&mut **tx).await?
                }
            };
            Ok(rows)
        })
        .await
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        bounded(self.statement_timeout, operation).await
    }
}

/// Bound a storage future by `limit`; dropping it on expiry cancels the call.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Storage operation timed out");
            Err(StorageError::Timeout(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_fast_results() {
        let result = bounded(Duration::from_millis(100), async { Ok::<_, StorageError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_reports_timeout() {
        let result = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StorageError>(())
        })
        .await;

        assert!(matches!(result, Err(StorageError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_closed_transaction_slot_reports_stale_handle() {
        let db = PgExecutor::new(DbHandle::Transaction(Arc::new(Mutex::new(None))), Duration::from_secs(1));

        let result = db.execute(sqlx::query("SELECT 1")).await;

        assert!(matches!(result, Err(StorageError::StaleHandle)));
    }
}
