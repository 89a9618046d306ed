// Private module declaration
mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

pub use server::start_metrics_server;

// ============================================================================
// Metrics - Prometheus metrics for the order pipeline
// ============================================================================
//
// Covers:
// - Lifecycle operations (created, updated, status changes, failures)
// - Broker publishing (latency, failures, reconnects, circuit breaker)
// - Redelivery backlog and outcomes
//
// Scraped via GET /metrics on the metrics server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Lifecycle
    pub orders_created: IntCounter,
    pub orders_updated: IntCounter,
    pub status_changes: IntCounterVec,
    pub operations_failed: IntCounterVec,

    // Publishing
    pub publish_duration: HistogramVec,
    pub publish_failures: IntCounterVec,
    pub broker_reconnects: IntCounter,
    pub circuit_breaker_state: IntGauge,
    pub circuit_breaker_transitions: IntCounterVec,

    // Redelivery
    pub redelivery_attempts: IntCounterVec,
    pub redelivery_pending: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let orders_updated = IntCounter::new("orders_updated_total", "Order contents edited")?;
        registry.register(Box::new(orders_updated.clone()))?;

        let status_changes = IntCounterVec::new(
            Opts::new("order_status_changes_total", "Order status changes by target status"),
            &["status"],
        )?;
        registry.register(Box::new(status_changes.clone()))?;

        let operations_failed = IntCounterVec::new(
            Opts::new("order_operations_failed_total", "Lifecycle operations that returned an error"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(operations_failed.clone()))?;

        let publish_duration = HistogramVec::new(
            HistogramOpts::new("publish_duration_seconds", "Time to hand an order snapshot to the broker")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["queue"],
        )?;
        registry.register(Box::new(publish_duration.clone()))?;

        let publish_failures = IntCounterVec::new(
            Opts::new("publish_failures_total", "Failed publish calls"),
            &["reason"],
        )?;
        registry.register(Box::new(publish_failures.clone()))?;

        let broker_reconnects = IntCounter::new(
            "broker_reconnects_total",
            "Broker connections re-established after a failure",
        )?;
        registry.register(Box::new(broker_reconnects.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let circuit_breaker_transitions = IntCounterVec::new(
            Opts::new("circuit_breaker_transitions_total", "Circuit breaker state transitions"),
            &["from_state", "to_state"],
        )?;
        registry.register(Box::new(circuit_breaker_transitions.clone()))?;

        let redelivery_attempts = IntCounterVec::new(
            Opts::new("redelivery_attempts_total", "Reconciler redelivery outcomes"),
            &["outcome"],
        )?;
        registry.register(Box::new(redelivery_attempts.clone()))?;

        let redelivery_pending = IntGauge::new(
            "redelivery_pending",
            "Orders waiting for their latest snapshot to be delivered",
        )?;
        registry.register(Box::new(redelivery_pending.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            orders_updated,
            status_changes,
            operations_failed,
            publish_duration,
            publish_failures,
            broker_reconnects,
            circuit_breaker_state,
            circuit_breaker_transitions,
            redelivery_attempts,
            redelivery_pending,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_operation_failure(&self, operation: &str, reason: &str) {
        self.operations_failed.with_label_values(&[operation, reason]).inc();
    }

    pub fn record_status_change(&self, status: &str) {
        self.status_changes.with_label_values(&[status]).inc();
    }

    pub fn record_publish(&self, queue: &str, duration_secs: f64) {
        self.publish_duration.with_label_values(&[queue]).observe(duration_secs);
    }

    pub fn record_publish_failure(&self, reason: &str) {
        self.publish_failures.with_label_values(&[reason]).inc();
    }

    pub fn record_circuit_breaker_transition(&self, from_state: &str, to_state: &str, gauge: i64) {
        self.circuit_breaker_transitions
            .with_label_values(&[from_state, to_state])
            .inc();
        self.circuit_breaker_state.set(gauge);
    }

    pub fn record_redelivery(&self, outcome: &str) {
        self.redelivery_attempts.with_label_values(&[outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(
        families: &'a [prometheus::proto::MetricFamily],
        name: &str,
    ) -> &'a prometheus::proto::MetricFamily {
        families.iter().find(|m| m.name() == name).unwrap()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_operation_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation_failure("update", "edit_forbidden");
        metrics.record_operation_failure("update", "edit_forbidden");
        metrics.record_operation_failure("create", "delivery");

        let gathered = metrics.registry().gather();
        let failed = find(&gathered, "order_operations_failed_total");
        assert_eq!(failed.metric.len(), 2);
    }

    #[test]
    fn test_record_publish_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_publish_failure("timeout");

        let gathered = metrics.registry().gather();
        let failures = find(&gathered, "publish_failures_total");
        assert_eq!(failures.metric[0].counter.value, Some(1.0));
    }

    #[test]
    fn test_circuit_breaker_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.record_circuit_breaker_transition("closed", "open", 1);

        let gathered = metrics.registry().gather();
        let state = find(&gathered, "circuit_breaker_state");
        assert_eq!(state.metric[0].gauge.value, Some(1.0));
    }
}
