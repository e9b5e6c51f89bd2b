use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    error::KafkaError,
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{encode, EventPublisher, PublishError, CONTENT_TYPE_JSON};
use crate::config::KafkaSettings;
use crate::metrics::Metrics;
use crate::models::DomainEvent;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

/// Kafka/Redpanda publisher. Each event is one record keyed by the order id.
pub struct RedpandaPublisher {
    producer: FutureProducer,
    circuit_breaker: CircuitBreaker,
    delivery_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl RedpandaPublisher {
    pub fn new(settings: &KafkaSettings) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("message.timeout.ms", settings.message_timeout.as_millis().to_string())
            .set("enable.idempotence", "true")
            .create()?;

        // Open after 5 failures, wait 30s before retry, need 3 successes to close
        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 3,
        };

        tracing::info!(brokers = %settings.brokers, "Kafka producer created");

        Ok(Self {
            producer,
            circuit_breaker: CircuitBreaker::new("kafka-publisher", cb_config),
            delivery_timeout: settings.message_timeout,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.get_state().await
    }

    async fn send_one(&self, record: FutureRecord<'_, str, str>) -> Result<(), CircuitBreakerError<KafkaError>> {
        self.circuit_breaker
            .call(async {
                self.producer
                    .send(record, Timeout::After(self.delivery_timeout))
                    .await
                    .map(|_| ())
                    .map_err(|(e, _)| e)
            })
            .await
    }
}

/// Record for one event, stamped with the event's own time rather than the send time.
fn build_record<'a>(
    destination: &'a str,
    key: &'a str,
    payload: &'a str,
    event_type: &str,
    correlation_id: &str,
    timestamp_ms: i64,
) -> FutureRecord<'a, str, str> {
    let headers = OwnedHeaders::new()
        .insert(Header {
            key: "content-type",
            value: Some(CONTENT_TYPE_JSON),
        })
        .insert(Header {
            key: "event-type",
            value: Some(event_type),
        })
        .insert(Header {
            key: "correlation-id",
            value: Some(correlation_id),
        });

    FutureRecord::to(destination)
        .key(key)
        .payload(payload)
        .timestamp(timestamp_ms)
        .headers(headers)
}

#[async_trait]
impl EventPublisher for RedpandaPublisher {
    async fn publish<E>(&self, events: &[E], destination: &str, correlation_id: Uuid) -> Result<(), PublishError>
    where
        E: DomainEvent + Serialize + Sync,
    {
        let correlation = correlation_id.to_string();

        for (index, event) in events.iter().enumerate() {
            let payload = encode(index, event)?;
            let key = event.aggregate_id().to_string();

            let record = build_record(
                destination,
                &key,
                &payload,
                event.event_type(),
                &correlation,
                event.timestamp().timestamp_millis(),
            );
            let result = self.send_one(record).await;

            if let Some(metrics) = &self.metrics {
                metrics.update_circuit_state(self.circuit_breaker.get_state().await);
            }

            match result {
                Ok(()) => {
                    tracing::debug!(topic = %destination, key = %key, "Published event");
                }
                Err(CircuitBreakerError::CircuitOpen) => {
                    tracing::error!(topic = %destination, index, "Circuit breaker open - broker unavailable");
                    return Err(PublishError::Unavailable { index });
                }
                Err(CircuitBreakerError::OperationFailed(e)) => {
                    tracing::error!(error = %e, topic = %destination, index, "Failed to publish event");
                    return Err(PublishError::Delivery {
                        index,
                        destination: destination.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(topic = %destination, count = events.len(), "Published events");
        Ok(())
    }
}
