// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (OrderItem, OrderStatus)
// - Intent (validated caller input)
// - Errors (ValidationError, LifecycleError)
// - Aggregate (Order, the persisted and published snapshot)
// - Per-order locks shared by every writer
// - Lifecycle service (create / update / status / publish orchestration)
//
// ============================================================================

pub mod value_objects;
pub mod intent;
pub mod errors;
pub mod aggregate;
pub mod locks;
pub mod lifecycle;

// Re-export for convenience
pub use value_objects::*;
pub use intent::*;
pub use errors::*;
pub use aggregate::*;
pub use locks::*;
pub use lifecycle::*;
