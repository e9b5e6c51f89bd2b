// ============================================================================
// Messaging - event emission to a durable destination
// ============================================================================
//
// `EventPublisher` serializes every event on its own and emits it. The first
// failing event aborts the call; events before it may already be out, so
// callers treat any error as a failure of the whole call.
//
// ============================================================================

mod memory;
mod redpanda;

pub use memory::{InMemoryPublisher, PublishedMessage};
pub use redpanda::RedpandaPublisher;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::DomainEvent;

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event {index} could not be serialized: {source}")]
    Serialization {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("event {index} was not delivered to {destination}: {reason}")]
    Delivery {
        index: usize,
        destination: String,
        reason: String,
    },

    #[error("event {index} rejected: publisher unavailable (circuit open)")]
    Unavailable { index: usize },
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Emit `events` in order to `destination`. `correlation_id` travels as
    /// message metadata so consumers can tie events back to one batch.
    async fn publish<E>(&self, events: &[E], destination: &str, correlation_id: Uuid) -> Result<(), PublishError>
    where
        E: DomainEvent + Serialize + Sync;
}

/// Serialize one event, tagging failures with its position.
pub(crate) fn encode<E: Serialize>(index: usize, event: &E) -> Result<String, PublishError> {
    serde_json::to_string(event).map_err(|source| PublishError::Serialization { index, source })
}
