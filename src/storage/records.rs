use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Row Shapes - `orders` and `order_items`
// ============================================================================

/// Persisted `orders` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub customer_id: i64,
    pub delivery_address: String,
    pub total_price_cents: i64,
    pub total_price_currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order header to insert; identity and timestamps come from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer_id: i64,
    pub delivery_address: String,
    pub total_price_cents: i64,
    pub total_price_currency: String,
}

/// Persisted `order_items` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItemRecord {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product_title: String,
    pub product_url: String,
    pub price_cents: i64,
    pub price_currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product_title: String,
    pub product_url: String,
    pub price_cents: i64,
    pub price_currency: String,
}

/// Status written for every item persisted by a batch.
pub const AUDIT_STATUS_CREATED: &str = "Created";

/// One row of `audit_log_order`: a status transition of an order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLogRecord {
    pub id: i64,
    pub order_id: i64,
    pub order_item_id: i64,
    pub customer_id: i64,
    pub order_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLog {
    pub order_id: i64,
    pub order_item_id: i64,
    pub customer_id: i64,
    pub order_status: String,
}

impl NewAuditLog {
    pub fn created(order: &OrderRecord, item: &OrderItemRecord) -> Self {
        Self {
            order_id: order.id,
            order_item_id: item.id,
            customer_id: order.customer_id,
            order_status: AUDIT_STATUS_CREATED.to_string(),
        }
    }
}

// ============================================================================
// Query Filters
// ============================================================================

/// Filter for `orders`. Empty id sets mean "no constraint"; present
/// constraints combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub ids: Vec<i64>,
    pub customer_ids: Vec<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderFilter {
    pub fn matches(&self, order: &OrderRecord) -> bool {
        (self.ids.is_empty() || self.ids.contains(&order.id))
            && (self.customer_ids.is_empty() || self.customer_ids.contains(&order.customer_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderItemFilter {
    pub ids: Vec<i64>,
    pub order_ids: Vec<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderItemFilter {
    pub fn for_orders(order_ids: Vec<i64>) -> Self {
        Self {
            order_ids,
            ..Self::default()
        }
    }

    pub fn matches(&self, item: &OrderItemRecord) -> bool {
        (self.ids.is_empty() || self.ids.contains(&item.id))
            && (self.order_ids.is_empty() || self.order_ids.contains(&item.order_id))
    }
}

/// Applies OFFSET then LIMIT to rows that are already in id order.
pub(crate) fn paginate<T>(rows: Vec<T>, limit: Option<i64>, offset: Option<i64>) -> Vec<T> {
    let offset = offset.filter(|o| *o > 0).unwrap_or(0) as usize;
    let rows = rows.into_iter().skip(offset);
    match limit.filter(|l| *l > 0) {
        Some(limit) => rows.take(limit as usize).collect(),
        None => rows.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, customer_id: i64) -> OrderRecord {
        OrderRecord {
            id,
            customer_id,
            delivery_address: "1 Main St".to_string(),
            total_price_cents: 100,
            total_price_currency: "USD".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = OrderFilter::default();
        assert!(filter.matches(&record(1, 7)));
    }

    #[test]
    fn test_id_and_customer_filters_combine_with_and() {
        let filter = OrderFilter {
            ids: vec![1, 2],
            customer_ids: vec![7],
            ..OrderFilter::default()
        };

        assert!(filter.matches(&record(1, 7)));
        assert!(!filter.matches(&record(1, 8)));
        assert!(!filter.matches(&record(3, 7)));
    }

    #[test]
    fn test_paginate_applies_offset_before_limit() {
        let rows: Vec<i64> = (1..=10).collect();
        assert_eq!(paginate(rows.clone(), Some(3), Some(2)), vec![3, 4, 5]);
        assert_eq!(paginate(rows.clone(), None, Some(8)), vec![9, 10]);
        assert_eq!(paginate(rows, Some(0), None).len(), 10);
    }
}
