use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::errors::{OrderServiceError, ValidationError};
use super::events::OrderCreatedMessage;
use super::query::OrderQuery;
use super::validation::{computed_total, OrderValidator};
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;
use crate::models::{Order, OrderItem};
use crate::storage::unit_of_work::release;
use crate::storage::{
    NewAuditLog, NewOrder, NewOrderItem, OrderItemFilter, StorageError, UnitOfWork, UnitOfWorkFactory,
};

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: validate → begin → insert headers → insert items (each with
// a "Created" audit row) → build events → publish → commit.
//
// Every transactional path runs its body and then `release`s the unit of
// work, so a failure anywhere after `begin` leaves nothing committed.
//
// Events are published before the commit. A commit failure after a
// successful publish leaves consumers with events for orders that do not
// exist; there is no outbox closing that gap.
//
// ============================================================================

pub struct OrderService<F, P> {
    uow_factory: F,
    publisher: P,
    validator: OrderValidator,
    order_created_topic: String,
    metrics: Option<Arc<Metrics>>,
}

impl<F, P> OrderService<F, P>
where
    F: UnitOfWorkFactory,
    P: EventPublisher,
{
    pub fn new(uow_factory: F, publisher: P, validator: OrderValidator, order_created_topic: impl Into<String>) -> Self {
        Self {
            uow_factory,
            publisher,
            validator,
            order_created_topic: order_created_topic.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Persist all orders and their items atomically and emit one
    /// `OrderCreated` event per order.
    ///
    /// Returns the orders in input order with identities and timestamps filled in.
    pub async fn batch_create_orders(&self, orders: Vec<Order>) -> Result<Vec<Order>, OrderServiceError> {
        let batch_id = Uuid::now_v7();
        let order_count = orders.len();
        let span = tracing::info_span!("batch_create_orders", %batch_id, order_count);
        let started = Instant::now();

        let result = self.create_batch(orders, batch_id).instrument(span).await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(created) => {
                tracing::info!(%batch_id, order_count = created.len(), "Order batch committed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_batch_success(created.len(), elapsed);
                }
            }
            Err(e) => {
                tracing::warn!(%batch_id, error = %e, kind = e.kind().as_str(), "Order batch failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_batch_failure(e.kind().as_str(), elapsed);
                }
            }
        }

        result
    }

    async fn create_batch(&self, orders: Vec<Order>, batch_id: Uuid) -> Result<Vec<Order>, OrderServiceError> {
        if orders.is_empty() {
            return Err(OrderServiceError::EmptyBatch);
        }

        for (index, order) in orders.iter().enumerate() {
            self.check_order(index, order)?;
        }
        tracing::debug!("Batch passed validation");

        let mut uow = self.uow_factory.create();
        uow.begin().await?;

        let result = self.persist_batch(&mut uow, orders, batch_id).await;
        release(&mut uow).await;
        result
    }

    async fn persist_batch(
        &self,
        uow: &mut F::Uow,
        mut orders: Vec<Order>,
        batch_id: Uuid,
    ) -> Result<Vec<Order>, OrderServiceError> {
        let headers: Vec<NewOrder> = orders.iter().map(Order::to_new_record).collect();
        let records = uow
            .order_repo()
            .bulk_insert_orders(&headers)
            .await
            .map_err(|e| OrderServiceError::storage("bulk insert orders", e))?;

        if records.len() != orders.len() {
            return Err(OrderServiceError::storage(
                "bulk insert orders",
                StorageError::RowCountMismatch {
                    table: "orders",
                    submitted: orders.len(),
                    returned: records.len(),
                },
            ));
        }
        tracing::debug!(count = records.len(), "Inserted order headers");

        let mut events = Vec::with_capacity(orders.len());
        for (index, (order, record)) in orders.iter_mut().zip(&records).enumerate() {
            order.mark_persisted(record);

            let item_repo = uow.order_item_repo();
            let audit_repo = uow.audit_log_repo();
            let mut item_records = Vec::with_capacity(order.items.len());
            for (item_index, item) in order.items.iter_mut().enumerate() {
                let persisted = item_repo
                    .create_order_item(&item.to_new_record(record.id))
                    .await
                    .map_err(|e| {
                        OrderServiceError::storage(format!("insert item {item_index} of order {index}"), e)
                    })?;
                audit_repo
                    .create_audit_log(&NewAuditLog::created(record, &persisted))
                    .await
                    .map_err(|e| {
                        OrderServiceError::storage(format!("audit item {item_index} of order {index}"), e)
                    })?;
                item.mark_persisted(&persisted);
                item_records.push(persisted);
            }

            events.push(OrderCreatedMessage::from_records(record, &item_records));
        }

        self.publisher
            .publish(&events, &self.order_created_topic, batch_id)
            .await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_events_published(&self.order_created_topic, events.len());
        }

        uow.commit().await?;
        Ok(orders)
    }

    /// Single-order transactional create without event emission.
    pub async fn create_order(&self, order: Order) -> Result<Order, OrderServiceError> {
        self.check_order(0, &order)?;

        let mut uow = self.uow_factory.create();
        uow.begin().await?;

        let result = Self::persist_order(&mut uow, order).await;
        release(&mut uow).await;

        if let Ok(created) = &result {
            tracing::info!(order_id = ?created.id, items = created.items.len(), "Order created");
            if let Some(metrics) = &self.metrics {
                metrics.orders_created.inc();
            }
        }
        result
    }

    async fn persist_order(uow: &mut F::Uow, mut order: Order) -> Result<Order, OrderServiceError> {
        let record = uow
            .order_repo()
            .create_order(&order.to_new_record())
            .await
            .map_err(|e| OrderServiceError::storage("insert order", e))?;
        order.mark_persisted(&record);

        let new_items: Vec<NewOrderItem> = order.items.iter().map(|item| item.to_new_record(record.id)).collect();
        let item_records = uow
            .order_item_repo()
            .bulk_insert_order_items(&new_items)
            .await
            .map_err(|e| OrderServiceError::storage("bulk insert order items", e))?;

        for (item, persisted) in order.items.iter_mut().zip(&item_records) {
            item.mark_persisted(persisted);
        }

        uow.commit().await?;
        Ok(order)
    }

    /// Order header plus all of its items.
    pub async fn get_order(&self, id: i64) -> Result<Order, OrderServiceError> {
        let uow = self.uow_factory.create();

        let record = uow.order_repo().get_order_by_id(id).await.map_err(|e| {
            if e.is_not_found() {
                OrderServiceError::NotFound(id)
            } else {
                OrderServiceError::storage("get order", e)
            }
        })?;

        let items = uow
            .order_item_repo()
            .get_order_items_by_order_id(id)
            .await
            .map_err(|e| OrderServiceError::storage("get order items", e))?;

        Ok(Order::from_record(record, items.into_iter().map(OrderItem::from_record).collect()))
    }

    pub async fn query_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, OrderServiceError> {
        let uow = self.uow_factory.create();

        let records = uow
            .order_repo()
            .query_orders(&query.to_filter())
            .await
            .map_err(|e| OrderServiceError::storage("query orders", e))?;

        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        if query.include_items {
            let order_ids: Vec<i64> = records.iter().map(|r| r.id).collect();
            let items = uow
                .order_item_repo()
                .query_order_items(&OrderItemFilter::for_orders(order_ids))
                .await
                .map_err(|e| OrderServiceError::storage("query order items", e))?;

            for item in items {
                items_by_order
                    .entry(item.order_id)
                    .or_default()
                    .push(OrderItem::from_record(item));
            }
        }

        tracing::debug!(count = records.len(), include_items = query.include_items, "Queried orders");

        Ok(records
            .into_iter()
            .map(|record| {
                let items = items_by_order.remove(&record.id).unwrap_or_default();
                Order::from_record(record, items)
            })
            .collect())
    }

    /// Structural validation followed by the price invariant.
    fn check_order(&self, index: usize, order: &Order) -> Result<(), OrderServiceError> {
        self.validator
            .validate(order)
            .map_err(|reason| OrderServiceError::Validation { index, reason })?;

        let computed = computed_total(order).map_err(|reason: ValidationError| OrderServiceError::Validation {
            index,
            reason,
        })?;

        if computed != order.total_price.amount_cents {
            return Err(OrderServiceError::PriceMismatch {
                index,
                stated: order.total_price.amount_cents,
                computed,
            });
        }
        Ok(())
    }
}
