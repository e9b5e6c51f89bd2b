use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::DomainEvent;
use crate::storage::{OrderItemRecord, OrderRecord};

// ============================================================================
// Order Events - Messages emitted after a batch is persisted
// ============================================================================

/// Flattened projection of a persisted order and its items.
///
/// Built only from storage rows, so every identity in the payload exists.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCreatedMessage {
    pub id: i64,
    pub customer_id: i64,
    pub delivery_address: String,
    pub total_price_cents: i64,
    pub total_price_currency: String,
    pub created_at: DateTime<Utc>,
    pub order_items: Vec<OrderItemMessage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItemMessage {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_title: String,
    pub product_url: String,
    pub quantity: i32,
    pub price_cents: i64,
    pub price_currency: String,
}

impl OrderCreatedMessage {
    pub fn from_records(order: &OrderRecord, items: &[OrderItemRecord]) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            delivery_address: order.delivery_address.clone(),
            total_price_cents: order.total_price_cents,
            total_price_currency: order.total_price_currency.clone(),
            created_at: order.created_at,
            order_items: items.iter().map(OrderItemMessage::from).collect(),
        }
    }
}

impl From<&OrderItemRecord> for OrderItemMessage {
    fn from(item: &OrderItemRecord) -> Self {
        Self {
            id: item.id,
            order_id: item.order_id,
            product_id: item.product_id,
            product_title: item.product_title.clone(),
            product_url: item.product_url.clone(),
            quantity: item.quantity,
            price_cents: item.price_cents,
            price_currency: item.price_currency.clone(),
        }
    }
}

impl DomainEvent for OrderCreatedMessage {
    fn event_type(&self) -> &'static str {
        "OrderCreated"
    }

    fn aggregate_id(&self) -> i64 {
        self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_uses_wire_field_names() {
        let now = Utc::now();
        let order = OrderRecord {
            id: 5,
            customer_id: 9,
            delivery_address: "Main St 1".into(),
            total_price_cents: 400,
            total_price_currency: "USD".into(),
            created_at: now,
            updated_at: now,
        };
        let item = OrderItemRecord {
            id: 11,
            order_id: 5,
            product_id: 3,
            quantity: 2,
            product_title: "Mug".into(),
            product_url: "https://shop.example.com/mug".into(),
            price_cents: 200,
            price_currency: "USD".into(),
            created_at: now,
            updated_at: now,
        };

        let message = OrderCreatedMessage::from_records(&order, &[item]);
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["id"], 5);
        assert_eq!(json["total_price_cents"], 400);
        assert_eq!(json["order_items"][0]["order_id"], 5);
        assert_eq!(json["order_items"][0]["price_currency"], "USD");
        assert_eq!(message.event_type(), "OrderCreated");
        assert_eq!(message.aggregate_id(), 5);
    }
}
