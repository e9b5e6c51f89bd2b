use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{encode, EventPublisher, PublishError, CONTENT_TYPE_JSON};
use crate::models::DomainEvent;

/// One emitted message as a broker would have received it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub destination: String,
    pub key: String,
    pub event_type: String,
    pub content_type: String,
    pub correlation_id: Uuid,
    pub payload: String,
}

/// Recording publisher for local runs (MESSAGING_BACKEND=memory) and tests.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    messages: Arc<Mutex<Vec<PublishedMessage>>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn messages_for(&self, destination: &str) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m.destination == destination)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish<E>(&self, events: &[E], destination: &str, correlation_id: Uuid) -> Result<(), PublishError>
    where
        E: DomainEvent + Serialize + Sync,
    {
        for (index, event) in events.iter().enumerate() {
            let payload = encode(index, event)?;
            self.messages.lock().await.push(PublishedMessage {
                destination: destination.to_string(),
                key: event.aggregate_id().to_string(),
                event_type: event.event_type().to_string(),
                content_type: CONTENT_TYPE_JSON.to_string(),
                correlation_id,
                payload,
            });
        }

        tracing::debug!(destination, count = events.len(), "Recorded events in memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[derive(Serialize)]
    struct Ping {
        id: i64,
    }

    impl DomainEvent for Ping {
        fn event_type(&self) -> &'static str {
            "Ping"
        }

        fn aggregate_id(&self) -> i64 {
            self.id
        }

        fn timestamp(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    #[tokio::test]
    async fn test_records_each_event_in_order() {
        let publisher = InMemoryPublisher::new();
        let correlation_id = Uuid::new_v4();

        publisher
            .publish(&[Ping { id: 1 }, Ping { id: 2 }], "pings", correlation_id)
            .await
            .unwrap();

        let messages = publisher.messages_for("pings").await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].key, "1");
        assert_eq!(messages[1].payload, r#"{"id":2}"#);
        assert_eq!(messages[0].event_type, "Ping");
        assert_eq!(messages[0].content_type, "application/json");
        assert!(messages.iter().all(|m| m.correlation_id == correlation_id));
        assert!(publisher.messages_for("other").await.is_empty());
    }
}
