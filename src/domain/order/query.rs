use serde::{Deserialize, Serialize};

use crate::storage::OrderFilter;

pub const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OrderQuery {
    #[serde(default)]
    pub ids: Vec<i64>,
    #[serde(default)]
    pub customer_ids: Vec<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    #[serde(default, rename = "include_order_items")]
    pub include_items: bool,
}

impl OrderQuery {
    /// Page/page-size become limit/offset only when both are present and
    /// positive; anything else falls back to the first `DEFAULT_PAGE_SIZE` rows.
    pub fn to_filter(&self) -> OrderFilter {
        let (limit, offset) = match (self.page, self.page_size) {
            (Some(page), Some(size)) if page > 0 && size > 0 => {
                (size, (page - 1).saturating_mul(size))
            }
            _ => (DEFAULT_PAGE_SIZE, 0),
        };

        OrderFilter {
            ids: self.ids.clone(),
            customer_ids: self.customer_ids.clone(),
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_translates_to_limit_and_offset() {
        let query = OrderQuery {
            page: Some(3),
            page_size: Some(20),
            ..OrderQuery::default()
        };

        let filter = query.to_filter();
        assert_eq!(filter.limit, Some(20));
        assert_eq!(filter.offset, Some(40));
    }

    #[test]
    fn test_partial_or_non_positive_paging_uses_defaults() {
        for (page, page_size) in [(None, Some(10)), (Some(2), None), (Some(0), Some(10)), (Some(1), Some(-5))] {
            let filter = OrderQuery {
                page,
                page_size,
                ..OrderQuery::default()
            }
            .to_filter();

            assert_eq!(filter.limit, Some(DEFAULT_PAGE_SIZE));
            assert_eq!(filter.offset, Some(0));
        }
    }

    #[test]
    fn test_query_deserializes_from_request_shape() {
        let query: OrderQuery =
            serde_json::from_str(r#"{"customer_ids":[4],"page":1,"page_size":5,"include_order_items":true}"#).unwrap();

        assert_eq!(query.customer_ids, vec![4]);
        assert!(query.ids.is_empty());
        assert!(query.include_items);
    }
}
