use std::collections::HashSet;
use url::Url;

use super::errors::{ItemViolation, TextViolation, ValidationError};
use crate::models::{Order, OrderItem};

// ============================================================================
// Order Validation
// ============================================================================
//
// Structural checks run before any storage call. The validator is stateless
// apart from its rules and is constructed once, then handed to the service.
//
// ============================================================================

pub const MAX_TEXT_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct ValidationRules {
    /// Upper-case ISO-4217 codes.
    pub allowed_currencies: HashSet<String>,
    /// Reject items priced in a different currency than their order.
    pub require_item_currency_match: bool,
    pub max_text_len: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            allowed_currencies: ["USD", "EUR"].into_iter().map(String::from).collect(),
            require_item_currency_match: false,
            max_text_len: MAX_TEXT_LEN,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderValidator {
    rules: ValidationRules,
}

impl OrderValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn validate(&self, order: &Order) -> Result<(), ValidationError> {
        if order.is_persisted() {
            return Err(ValidationError::AlreadyPersisted);
        }
        if order.customer_id <= 0 {
            return Err(ValidationError::InvalidCustomerId(order.customer_id));
        }
        self.check_text(&order.delivery_address)
            .map_err(ValidationError::DeliveryAddress)?;
        if order.total_price.amount_cents <= 0 {
            return Err(ValidationError::InvalidTotal(order.total_price.amount_cents));
        }
        if !self.currency_allowed(&order.total_price.currency) {
            return Err(ValidationError::UnsupportedCurrency(order.total_price.currency.clone()));
        }
        if order.items.is_empty() {
            return Err(ValidationError::NoItems);
        }

        for (index, item) in order.items.iter().enumerate() {
            self.validate_item(item, &order.total_price.currency)
                .map_err(|violation| ValidationError::Item { index, violation })?;
        }

        Ok(())
    }

    fn validate_item(&self, item: &OrderItem, order_currency: &str) -> Result<(), ItemViolation> {
        if item.id.is_some() {
            return Err(ItemViolation::AlreadyPersisted);
        }
        if item.product_id <= 0 {
            return Err(ItemViolation::InvalidProductId(item.product_id));
        }
        if item.quantity <= 0 {
            return Err(ItemViolation::InvalidQuantity(item.quantity));
        }
        self.check_text(&item.product_title)
            .map_err(ItemViolation::ProductTitle)?;
        if !is_absolute_url(&item.product_url) {
            return Err(ItemViolation::InvalidProductUrl(item.product_url.clone()));
        }
        if item.price.amount_cents <= 0 {
            return Err(ItemViolation::InvalidPrice(item.price.amount_cents));
        }
        if !self.currency_allowed(&item.price.currency) {
            return Err(ItemViolation::UnsupportedCurrency(item.price.currency.clone()));
        }
        if self.rules.require_item_currency_match && item.price.currency != order_currency {
            return Err(ItemViolation::CurrencyMismatch {
                item: item.price.currency.clone(),
                order: order_currency.to_string(),
            });
        }
        Ok(())
    }

    fn check_text(&self, value: &str) -> Result<(), TextViolation> {
        if value.trim().is_empty() {
            return Err(TextViolation::Empty);
        }
        let actual = value.chars().count();
        if actual > self.rules.max_text_len {
            return Err(TextViolation::TooLong {
                max: self.rules.max_text_len,
                actual,
            });
        }
        Ok(())
    }

    fn currency_allowed(&self, currency: &str) -> bool {
        self.rules.allowed_currencies.contains(currency)
    }
}

fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).map(|url| url.has_host()).unwrap_or(false)
}

/// `sum(price * quantity)` over all items, with overflow reported instead of wrapping.
pub fn computed_total(order: &Order) -> Result<i64, ValidationError> {
    order.items.iter().try_fold(0i64, |acc, item| {
        item.price
            .amount_cents
            .checked_mul(i64::from(item.quantity))
            .and_then(|line| acc.checked_add(line))
            .ok_or(ValidationError::TotalOverflow)
    })
}
