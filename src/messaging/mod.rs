// ============================================================================
// Order Publisher - durable hand-off of order snapshots to the kitchen queue
// ============================================================================
//
// A publisher either gets a broker acknowledgement for the whole message or
// returns a DeliveryError. It never mutates or keeps order data.
//
// ============================================================================

mod amqp;
mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::health::HealthStatus;
use crate::utils::IsTransient;

pub use amqp::{AmqpPublisher, AmqpPublisherConfig};
pub(crate) use amqp::redact_url;
pub use memory::{InMemoryPublisher, PublishedMessage};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("broker rejected message for queue {queue}: {reason}")]
    Rejected { queue: String, reason: String },

    #[error("circuit breaker open, broker considered unavailable")]
    CircuitOpen,

    #[error("failed to encode order snapshot: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publisher has been closed")]
    Closed,
}

impl DeliveryError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DeliveryError::Connection(_) => "connection",
            DeliveryError::Timeout(_) => "timeout",
            DeliveryError::Rejected { .. } => "rejected",
            DeliveryError::CircuitOpen => "circuit_open",
            DeliveryError::Serialization(_) => "serialization",
            DeliveryError::Closed => "closed",
        }
    }
}

impl IsTransient for DeliveryError {
    fn is_transient(&self) -> bool {
        !matches!(self, DeliveryError::Serialization(_) | DeliveryError::Closed)
    }
}

/// Encodes the snapshot exactly as the kitchen consumer reads it.
pub fn encode_snapshot(order: &Order) -> Result<Vec<u8>, DeliveryError> {
    Ok(serde_json::to_vec(order)?)
}

#[async_trait]
pub trait OrderPublisher: Send + Sync {
    /// Publishes one snapshot to the configured durable queue.
    async fn publish(&self, order: &Order) -> Result<(), DeliveryError>;

    /// Destination queue name.
    fn destination(&self) -> &str;

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }

    /// Releases broker resources. Later publishes fail with `Closed`.
    async fn close(&self) -> Result<(), DeliveryError> {
        Ok(())
    }
}
