// ============================================================================
// Order Store - persistence abstraction
// ============================================================================
//
// The store is the single source of truth for "does this id exist".
// Backends are picked at construction time and handed to the lifecycle
// service as `Arc<dyn OrderStore>`.
//
// ============================================================================

mod memory;
mod scylla;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::health::HealthStatus;

pub use memory::InMemoryOrderStore;
pub use scylla::ScyllaOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order {0} already exists")]
    Conflict(String),

    #[error("order {0} not found")]
    NotFound(String),

    #[error("id {0} cannot be represented by this backend")]
    InvalidId(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("document encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order and returns what was stored. Backends that assign
    /// identity return the order carrying the assigned id.
    async fn add(&self, order: Order) -> Result<Order, StoreError>;

    /// `Ok(None)` for an unknown id, never an error.
    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Whole-record replace. Atomic per record.
    async fn update(&self, id: &str, order: Order) -> Result<(), StoreError>;

    /// All orders, in no particular order.
    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// Backend name for logs and health reports.
    fn backend_name(&self) -> &'static str;

    /// Cheap liveness check against the backend.
    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
