// ============================================================================
// Order Domain - Batch order creation and querying
// ============================================================================
//
// - validation  - OrderValidator / ValidationRules (structural checks)
// - events      - OrderCreatedMessage (flattened, built from persisted rows)
// - query       - OrderQuery and its page → limit/offset translation
// - errors      - ValidationError, OrderServiceError, ErrorKind, ErrorBody
// - service     - OrderService orchestrating the unit of work and publisher
//
// ============================================================================

pub mod errors;
pub mod events;
pub mod query;
pub mod service;
pub mod validation;

pub use errors::{ErrorBody, ErrorKind, ItemViolation, OrderServiceError, TextViolation, ValidationError};
pub use events::{OrderCreatedMessage, OrderItemMessage};
pub use query::{OrderQuery, DEFAULT_PAGE_SIZE};
pub use service::OrderService;
pub use validation::{computed_total, OrderValidator, ValidationRules};
