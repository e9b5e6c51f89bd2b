use serde::{Deserialize, Serialize};

use crate::messaging::PublishError;
use crate::storage::{StorageError, TransactionError};

// ============================================================================
// Order Validation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemViolation {
    #[error("product_id must be positive, got {0}")]
    InvalidProductId(i64),

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("product_title {0}")]
    ProductTitle(TextViolation),

    #[error("product_url is not a valid absolute URL: {0}")]
    InvalidProductUrl(String),

    #[error("price must be positive, got {0}")]
    InvalidPrice(i64),

    #[error("currency '{0}' is not accepted")]
    UnsupportedCurrency(String),

    #[error("currency '{item}' differs from order currency '{order}'")]
    CurrencyMismatch { item: String, order: String },

    #[error("item is already persisted")]
    AlreadyPersisted,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextViolation {
    #[error("must not be empty")]
    Empty,

    #[error("must be at most {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Structural violation of a single order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("order is already persisted")]
    AlreadyPersisted,

    #[error("customer_id must be positive, got {0}")]
    InvalidCustomerId(i64),

    #[error("delivery_address {0}")]
    DeliveryAddress(TextViolation),

    #[error("total price must be positive, got {0}")]
    InvalidTotal(i64),

    #[error("currency '{0}' is not accepted")]
    UnsupportedCurrency(String),

    #[error("order has no items")]
    NoItems,

    #[error("item {index}: {violation}")]
    Item { index: usize, violation: ItemViolation },

    #[error("item totals overflow")]
    TotalOverflow,
}

// ============================================================================
// Order Service Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderServiceError {
    #[error("batch contains no orders")]
    EmptyBatch,

    #[error("order {index}: {reason}")]
    Validation { index: usize, reason: ValidationError },

    #[error("order {index}: stated total {stated} does not match item total {computed}")]
    PriceMismatch { index: usize, stated: i64, computed: i64 },

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("{operation} failed: {source}")]
    Storage {
        operation: String,
        #[source]
        source: StorageError,
    },

    #[error("order {0} not found")]
    NotFound(i64),

    #[error("publishing events failed: {0}")]
    Publish(#[from] PublishError),
}

impl OrderServiceError {
    pub(crate) fn storage(operation: impl Into<String>, source: StorageError) -> Self {
        OrderServiceError::Storage {
            operation: operation.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderServiceError::EmptyBatch | OrderServiceError::Validation { .. } => ErrorKind::Validation,
            OrderServiceError::PriceMismatch { .. } => ErrorKind::PriceMismatch,
            OrderServiceError::Transaction(TransactionError::Storage(_)) => ErrorKind::Storage,
            OrderServiceError::Transaction(_) => ErrorKind::TransactionState,
            OrderServiceError::Storage { .. } => ErrorKind::Storage,
            OrderServiceError::NotFound(_) => ErrorKind::NotFound,
            OrderServiceError::Publish(_) => ErrorKind::Publish,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Machine-checkable error category, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    PriceMismatch,
    TransactionState,
    Storage,
    NotFound,
    Publish,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::PriceMismatch => "price_mismatch",
            ErrorKind::TransactionState => "transaction_state",
            ErrorKind::Storage => "storage",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Publish => "publish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
