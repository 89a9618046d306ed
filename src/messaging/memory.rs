use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{encode_snapshot, DeliveryError, OrderPublisher};
use crate::domain::order::Order;
use crate::health::HealthStatus;

/// Message as it would have reached the broker.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub queue: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn order(&self) -> Result<Order, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Broker stand-in for local runs and tests. Can be switched off or told to
/// fail a number of upcoming publishes.
pub struct InMemoryPublisher {
    queue: String,
    messages: Mutex<Vec<PublishedMessage>>,
    available: AtomicBool,
    failures_left: AtomicU32,
    closed: AtomicBool,
}

impl InMemoryPublisher {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            messages: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            failures_left: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.lock().clone()
    }

    pub fn published_orders(&self) -> Vec<Order> {
        self.lock()
            .iter()
            .filter_map(|m| m.order().ok())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PublishedMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl OrderPublisher for InMemoryPublisher {
    async fn publish(&self, order: &Order) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeliveryError::Closed);
        }
        if !self.available.load(Ordering::SeqCst) || self.take_failure() {
            return Err(DeliveryError::Connection("broker unreachable".to_string()));
        }

        let payload = encode_snapshot(order)?;
        self.lock().push(PublishedMessage {
            queue: self.queue.clone(),
            payload,
        });

        tracing::debug!(order_id = %order.id, queue = %self.queue, "Recorded order snapshot");
        Ok(())
    }

    fn destination(&self) -> &str {
        &self.queue
    }

    async fn health(&self) -> HealthStatus {
        if self.available.load(Ordering::SeqCst) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy("broker unreachable".to_string())
        }
    }

    async fn close(&self) -> Result<(), DeliveryError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
