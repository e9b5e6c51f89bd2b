use sqlx::PgPool;
use std::time::Duration;

use super::executor::{DbHandle, PgExecutor};
use crate::storage::errors::StorageError;

/// Idempotent bootstrap for local runs; production schemas are managed elsewhere.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id                   BIGSERIAL PRIMARY KEY,
        customer_id          BIGINT      NOT NULL,
        delivery_address     TEXT        NOT NULL,
        total_price_cents    BIGINT      NOT NULL,
        total_price_currency TEXT        NOT NULL,
        created_at           TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at           TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS order_items (
        id             BIGSERIAL PRIMARY KEY,
        order_id       BIGINT      NOT NULL REFERENCES orders (id),
        product_id     BIGINT      NOT NULL,
        quantity       INTEGER     NOT NULL CHECK (quantity > 0),
        product_title  TEXT        NOT NULL,
        product_url    TEXT        NOT NULL,
        price_cents    BIGINT      NOT NULL,
        price_currency TEXT        NOT NULL,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS audit_log_order (
        id            BIGSERIAL PRIMARY KEY,
        order_id      BIGINT      NOT NULL REFERENCES orders (id),
        order_item_id BIGINT      NOT NULL REFERENCES order_items (id),
        customer_id   BIGINT      NOT NULL,
        order_status  TEXT        NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer_id ON orders (customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items (order_id)",
    "CREATE INDEX IF NOT EXISTS idx_audit_log_order_order_id ON audit_log_order (order_id)",
];

pub async fn ensure_schema(pool: &PgPool, statement_timeout: Duration) -> Result<(), StorageError> {
    let db = PgExecutor::new(DbHandle::Pool(pool.clone()), statement_timeout);
    for statement in SCHEMA_STATEMENTS {
        db.execute(sqlx::query(statement)).await?;
    }

    tracing::info!(statements = SCHEMA_STATEMENTS.len(), "Order schema ensured");
    Ok(())
}
