// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

use crate::utils::CircuitState;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order batch throughput, outcome and latency
// - Failures broken down by error kind
// - Events emitted per destination
// - Publisher circuit breaker state
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the order pipeline
pub struct Metrics {
    registry: Registry,

    // Order Metrics
    pub orders_created: IntCounter,
    pub order_batches: IntCounterVec,
    pub order_batch_failures: IntCounterVec,
    pub order_batch_duration: Histogram,

    // Publisher Metrics
    pub events_published: IntCounterVec,
    pub publisher_circuit_state: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders persisted and committed")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_batches = IntCounterVec::new(
            Opts::new("order_batches_total", "Order batches processed"),
            &["outcome"],
        )?;
        registry.register(Box::new(order_batches.clone()))?;

        let order_batch_failures = IntCounterVec::new(
            Opts::new("order_batch_failures_total", "Failed order batches by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(order_batch_failures.clone()))?;

        let order_batch_duration = Histogram::with_opts(
            HistogramOpts::new("order_batch_duration_seconds", "End-to-end batch creation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(order_batch_duration.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("order_events_published_total", "Order events emitted"),
            &["topic"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let publisher_circuit_state = IntGauge::new(
            "publisher_circuit_state",
            "Publisher circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(publisher_circuit_state.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_batches,
            order_batch_failures,
            order_batch_duration,
            events_published,
            publisher_circuit_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_batch_success(&self, orders: usize, duration_secs: f64) {
        self.orders_created.inc_by(orders as u64);
        self.order_batches.with_label_values(&["success"]).inc();
        self.order_batch_duration.observe(duration_secs);
    }

    pub fn record_batch_failure(&self, kind: &str, duration_secs: f64) {
        self.order_batches.with_label_values(&["failure"]).inc();
        self.order_batch_failures.with_label_values(&[kind]).inc();
        self.order_batch_duration.observe(duration_secs);
    }

    pub fn record_events_published(&self, topic: &str, count: usize) {
        self.events_published.with_label_values(&[topic]).inc_by(count as u64);
    }

    pub fn update_circuit_state(&self, state: CircuitState) {
        self.publisher_circuit_state.set(state.as_gauge());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> Vec<f64> {
        metrics
            .registry
            .gather()
            .iter()
            .find(|m| m.name() == name)
            .map(|family| {
                family
                    .metric
                    .iter()
                    .map(|m| m.counter.value.unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_batch_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_batch_success(3, 0.02);
        metrics.record_batch_failure("price_mismatch", 0.001);

        assert_eq!(counter_value(&metrics, "orders_created_total"), vec![3.0]);
        assert_eq!(counter_value(&metrics, "order_batch_failures_total"), vec![1.0]);
        assert_eq!(counter_value(&metrics, "order_batches_total").len(), 2);
    }

    #[test]
    fn test_circuit_state_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.update_circuit_state(CircuitState::Open);

        assert_eq!(metrics.publisher_circuit_state.get(), 1);
    }
}
