use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::storage::{NewOrder, NewOrderItem, OrderItemRecord, OrderRecord};

// ============================================================================
// Domain Models
// ============================================================================
//
// An Order owns its items. Identities and timestamps are `None` until the
// storage layer assigns them on insert.
//
// ============================================================================

/// Integer minor-unit amount plus ISO-4217 currency code.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Money {
    pub amount_cents: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount_cents: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_cents,
            currency: currency.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub customer_id: i64,
    pub delivery_address: String,
    pub total_price: Money,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub id: Option<i64>,
    pub order_id: Option<i64>,
    pub product_id: i64,
    pub quantity: i32,
    pub product_title: String,
    pub product_url: String,
    pub price: Money,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A not-yet-persisted order.
    pub fn new(
        customer_id: i64,
        delivery_address: impl Into<String>,
        total_price: Money,
        items: Vec<OrderItem>,
    ) -> Self {
        Self {
            id: None,
            customer_id,
            delivery_address: delivery_address.into(),
            total_price,
            created_at: None,
            updated_at: None,
            items,
        }
    }

    pub fn from_record(record: OrderRecord, items: Vec<OrderItem>) -> Self {
        Self {
            id: Some(record.id),
            customer_id: record.customer_id,
            delivery_address: record.delivery_address,
            total_price: Money::new(record.total_price_cents, record.total_price_currency),
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
            items,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn to_new_record(&self) -> NewOrder {
        NewOrder {
            customer_id: self.customer_id,
            delivery_address: self.delivery_address.clone(),
            total_price_cents: self.total_price.amount_cents,
            total_price_currency: self.total_price.currency.clone(),
        }
    }

    /// Write storage-assigned identity and timestamps back onto the header.
    pub fn mark_persisted(&mut self, record: &OrderRecord) {
        self.id = Some(record.id);
        self.created_at = Some(record.created_at);
        self.updated_at = Some(record.updated_at);
    }
}

impl OrderItem {
    pub fn new(
        product_id: i64,
        quantity: i32,
        product_title: impl Into<String>,
        product_url: impl Into<String>,
        price: Money,
    ) -> Self {
        Self {
            id: None,
            order_id: None,
            product_id,
            quantity,
            product_title: product_title.into(),
            product_url: product_url.into(),
            price,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn from_record(record: OrderItemRecord) -> Self {
        Self {
            id: Some(record.id),
            order_id: Some(record.order_id),
            product_id: record.product_id,
            quantity: record.quantity,
            product_title: record.product_title,
            product_url: record.product_url,
            price: Money::new(record.price_cents, record.price_currency),
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
        }
    }

    pub fn to_new_record(&self, order_id: i64) -> NewOrderItem {
        NewOrderItem {
            order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            product_title: self.product_title.clone(),
            product_url: self.product_url.clone(),
            price_cents: self.price.amount_cents,
            price_currency: self.price.currency.clone(),
        }
    }

    pub fn mark_persisted(&mut self, record: &OrderItemRecord) {
        self.id = Some(record.id);
        self.order_id = Some(record.order_id);
        self.created_at = Some(record.created_at);
        self.updated_at = Some(record.updated_at);
    }
}

// ============================================================================
// Domain Events
// These represent state changes that have occurred in the system
// ============================================================================

/// Base trait for all domain events
pub trait DomainEvent {
    fn event_type(&self) -> &'static str;
    fn aggregate_id(&self) -> i64;
    fn timestamp(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            id: 7,
            customer_id: 42,
            delivery_address: "1 Main St".into(),
            total_price_cents: 1500,
            total_price_currency: "EUR".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_order_is_not_persisted() {
        let order = Order::new(42, "1 Main St", Money::new(1500, "EUR"), vec![]);
        assert!(!order.is_persisted());
        assert!(order.created_at.is_none());
    }

    #[test]
    fn test_mark_persisted_copies_identity_and_timestamps() {
        let mut order = Order::new(42, "1 Main St", Money::new(1500, "EUR"), vec![]);
        let persisted = record();

        order.mark_persisted(&persisted);

        assert_eq!(order.id, Some(7));
        assert_eq!(order.created_at, Some(persisted.created_at));
        assert_eq!(order.total_price, Money::new(1500, "EUR"));
    }

    #[test]
    fn test_item_to_new_record_carries_parent_id() {
        let item = OrderItem::new(3, 2, "Lamp", "https://shop.example.com/lamp", Money::new(750, "EUR"));

        let new = item.to_new_record(7);

        assert_eq!(new.order_id, 7);
        assert_eq!(new.price_cents, 750);
        assert_eq!(new.price_currency, "EUR");
    }
}
