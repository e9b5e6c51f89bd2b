use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::executor::PgExecutor;
use crate::storage::errors::StorageError;
use crate::storage::records::{NewOrderItem, OrderItemFilter, OrderItemRecord};
use crate::storage::repository::OrderItemRepository;

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, product_title, product_url, \
                            price_cents, price_currency, created_at, updated_at";

const INSERT_ITEMS: &str = "INSERT INTO order_items \
     (order_id, product_id, quantity, product_title, product_url, price_cents, price_currency) ";

const ROWS_PER_STATEMENT: usize = 1000;

pub struct PgOrderItemRepository {
    db: PgExecutor,
}

impl PgOrderItemRepository {
    pub fn new(db: PgExecutor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderItemRepository for PgOrderItemRepository {
    async fn create_order_item(&self, item: &NewOrderItem) -> Result<OrderItemRecord, StorageError> {
        let sql = format!("{INSERT_ITEMS} VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ITEM_COLUMNS}");

        let record = self
            .db
            .query_one(
                sqlx::query_as::<_, OrderItemRecord>(&sql)
                    .bind(item.order_id)
                    .bind(item.product_id)
                    .bind(item.quantity)
                    .bind(&item.product_title)
                    .bind(&item.product_url)
                    .bind(item.price_cents)
                    .bind(&item.price_currency),
            )
            .await?
            .ok_or(StorageError::RowCountMismatch {
                table: "order_items",
                submitted: 1,
                returned: 0,
            })?;

        tracing::debug!(item_id = record.id, order_id = record.order_id, "Inserted order item");
        Ok(record)
    }

    async fn bulk_insert_order_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItemRecord>, StorageError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut inserted = Vec::with_capacity(items.len());

        for (chunk, mut builder) in items.chunks(ROWS_PER_STATEMENT).zip(build_bulk_insert(items)) {
            let mut rows = self.db.query_many(builder.build_query_as::<OrderItemRecord>()).await?;
            rows.sort_by_key(|row| row.id);

            if rows.len() != chunk.len() {
                return Err(StorageError::RowCountMismatch {
                    table: "order_items",
                    submitted: chunk.len(),
                    returned: rows.len(),
                });
            }
            inserted.extend(rows);
        }

        tracing::debug!(count = inserted.len(), "Bulk inserted order items");
        Ok(inserted)
    }

    async fn get_order_items_by_order_id(&self, order_id: i64) -> Result<Vec<OrderItemRecord>, StorageError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");

        self.db
            .query_many(sqlx::query_as::<_, OrderItemRecord>(&sql).bind(order_id))
            .await
    }

    async fn query_order_items(&self, filter: &OrderItemFilter) -> Result<Vec<OrderItemRecord>, StorageError> {
        let mut builder = build_query_order_items(filter);
        self.db.query_many(builder.build_query_as::<OrderItemRecord>()).await
    }
}

fn build_bulk_insert(items: &[NewOrderItem]) -> Vec<QueryBuilder<'static, Postgres>> {
    items
        .chunks(ROWS_PER_STATEMENT)
        .map(|chunk| {
            let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new(INSERT_ITEMS);
            builder.push_values(chunk, |mut row, item| {
                row.push_bind(item.order_id)
                    .push_bind(item.product_id)
                    .push_bind(item.quantity)
                    .push_bind(item.product_title.clone())
                    .push_bind(item.product_url.clone())
                    .push_bind(item.price_cents)
                    .push_bind(item.price_currency.clone());
            });
            builder.push(" RETURNING ");
            builder.push(ITEM_COLUMNS);
            builder
        })
        .collect()
}

fn build_query_order_items(filter: &OrderItemFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT ");
    builder.push(ITEM_COLUMNS);
    builder.push(" FROM order_items WHERE 1=1");

    if !filter.ids.is_empty() {
        builder.push(" AND id = ANY(").push_bind(filter.ids.clone()).push(")");
    }
    if !filter.order_ids.is_empty() {
        builder
            .push(" AND order_id = ANY(")
            .push_bind(filter.order_ids.clone())
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
