use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::executor::PgExecutor;
use crate::storage::errors::StorageError;
use crate::storage::records::{NewOrder, OrderFilter, OrderRecord};
use crate::storage::repository::OrderRepository;

const ORDER_COLUMNS: &str =
    "id, customer_id, delivery_address, total_price_cents, total_price_currency, created_at, updated_at";

/// Rows per INSERT statement; keeps the bind count far below Postgres' 65535 cap.
const ROWS_PER_STATEMENT: usize = 1000;

pub struct PgOrderRepository {
    db: PgExecutor,
}

impl PgOrderRepository {
    pub fn new(db: PgExecutor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderRecord, StorageError> {
        let sql = format!(
            "INSERT INTO orders (customer_id, delivery_address, total_price_cents, total_price_currency) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ORDER_COLUMNS}"
        );

        let record = self
            .db
            .query_one(
                sqlx::query_as::<_, OrderRecord>(&sql)
                    .bind(order.customer_id)
                    .bind(&order.delivery_address)
                    .bind(order.total_price_cents)
                    .bind(&order.total_price_currency),
            )
            .await?
            .ok_or(StorageError::RowCountMismatch {
                table: "orders",
                submitted: 1,
                returned: 0,
            })?;

        tracing::debug!(order_id = record.id, customer_id = record.customer_id, "Inserted order");
        Ok(record)
    }

    async fn bulk_insert_orders(&self, orders: &[NewOrder]) -> Result<Vec<OrderRecord>, StorageError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let mut inserted = Vec::with_capacity(orders.len());

        for (chunk, mut builder) in orders.chunks(ROWS_PER_STATEMENT).zip(build_bulk_insert(orders)) {
            let mut rows = self.db.query_many(builder.build_query_as::<OrderRecord>()).await?;

            // RETURNING order is unspecified, but identities are drawn from one
            // sequence in VALUES order, so ascending id is submission order.
            rows.sort_by_key(|row| row.id);

            if rows.len() != chunk.len() {
                return Err(StorageError::RowCountMismatch {
                    table: "orders",
                    submitted: chunk.len(),
                    returned: rows.len(),
                });
            }
            inserted.extend(rows);
        }

        tracing::debug!(count = inserted.len(), "Bulk inserted orders");
        Ok(inserted)
    }

    async fn get_order_by_id(&self, id: i64) -> Result<OrderRecord, StorageError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");

        self.db
            .query_one(sqlx::query_as::<_, OrderRecord>(&sql).bind(id))
            .await?
            .ok_or(StorageError::NotFound { entity: "order", id })
    }

    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>, StorageError> {
        let mut builder = build_query_orders(filter);
        self.db.query_many(builder.build_query_as::<OrderRecord>()).await
    }
}

/// One multi-row INSERT per `ROWS_PER_STATEMENT` chunk, in submission order.
fn build_bulk_insert(orders: &[NewOrder]) -> Vec<QueryBuilder<'static, Postgres>> {
    orders
        .chunks(ROWS_PER_STATEMENT)
        .map(|chunk| {
            let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new(
                "INSERT INTO orders (customer_id, delivery_address, total_price_cents, total_price_currency) ",
            );
            builder.push_values(chunk, |mut row, order| {
                row.push_bind(order.customer_id)
                    .push_bind(order.delivery_address.clone())
                    .push_bind(order.total_price_cents)
                    .push_bind(order.total_price_currency.clone());
            });
            builder.push(" RETURNING ");
            builder.push(ORDER_COLUMNS);
            builder
        })
        .collect()
}

/// Empty id sets add no predicate; LIMIT/OFFSET only when positive.
fn build_query_orders(filter: &OrderFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT ");
    builder.push(ORDER_COLUMNS);
    builder.push(" FROM orders WHERE 1=1");

    if !filter.ids.is_empty() {
        builder.push(" AND id = ANY(").push_bind(filter.ids.clone()).push(")");
    }
    if !filter.customer_ids.is_empty() {
        builder
            .push(" AND customer_id = ANY(")
            .push_bind(filter.customer_ids.clone())
            .push(")");
    }

    builder.push(" ORDER BY id");

    if let Some(limit) = filter.limit.filter(|l| *l > 0) {
        builder.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = filter.offset.filter(|o| *o > 0) {
        builder.push(" OFFSET ").push_bind(offset);
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(customer_id: i64) -> NewOrder {
        NewOrder {
            customer_id,
            delivery_address: "5 Harbour Lane".to_string(),
            total_price_cents: 100,
            total_price_currency: "USD".to_string(),
        }
    }

    fn select(tail: &str) -> String {
        format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1{tail}")
    }

    #[test]
    fn test_query_without_filters() {
        let builder = build_query_orders(&OrderFilter::default());
        assert_eq!(builder.sql(), select(" ORDER BY id"));
    }

    #[test]
    fn test_query_by_ids_only() {
        let filter = OrderFilter {
            ids: vec![1, 2],
            ..OrderFilter::default()
        };
        assert_eq!(build_query_orders(&filter).sql(), select(" AND id = ANY($1) ORDER BY id"));
    }

    #[test]
    fn test_query_ids_and_customers_are_and_combined() {
        let filter = OrderFilter {
            ids: vec![1],
            customer_ids: vec![7, 8],
            ..OrderFilter::default()
        };
        assert_eq!(
            build_query_orders(&filter).sql(),
            select(" AND id = ANY($1) AND customer_id = ANY($2) ORDER BY id")
        );
    }

    #[test]
    fn test_query_with_limit_and_offset() {
        let filter = OrderFilter {
            customer_ids: vec![7],
            limit: Some(20),
            offset: Some(40),
            ..OrderFilter::default()
        };
        assert_eq!(
            build_query_orders(&filter).sql(),
            select(" AND customer_id = ANY($1) ORDER BY id LIMIT $2 OFFSET $3")
        );
    }

    #[test]
    fn test_query_omits_zero_offset() {
        let filter = OrderFilter {
            limit: Some(100),
            offset: Some(0),
            ..OrderFilter::default()
        };
        assert_eq!(build_query_orders(&filter).sql(), select(" ORDER BY id LIMIT $1"));
    }

    #[test]
    fn test_bulk_insert_binds_rows_in_order() {
        let builders = build_bulk_insert(&[new_order(1), new_order(2)]);

        assert_eq!(builders.len(), 1);
        assert_eq!(
            builders[0].sql(),
            format!(
                "INSERT INTO orders (customer_id, delivery_address, total_price_cents, total_price_currency) \
                 VALUES ($1, $2, $3, $4), ($5, $6, $7, $8) RETURNING {ORDER_COLUMNS}"
            )
        );
    }

    #[test]
    fn test_bulk_insert_splits_large_input() {
        let orders: Vec<NewOrder> = (1..=1001).map(new_order).collect();

        let builders = build_bulk_insert(&orders);

        assert_eq!(builders.len(), 2);
        assert!(builders[0].sql().contains("($3997, $3998, $3999, $4000) RETURNING"));
        assert!(builders[1].sql().contains("VALUES ($1, $2, $3, $4) RETURNING"));
    }
}
