use rust_decimal::Decimal;

use super::aggregate::Order;
use super::value_objects::OrderStatus;
use crate::messaging::DeliveryError;
use crate::store::StoreError;

// ============================================================================
// Order Validation Errors
// ============================================================================

/// Field-level rejection raised while building an intent or an item.
/// Never reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("customerName must not be empty")]
    EmptyCustomerName,

    #[error("items must not be empty")]
    EmptyItems,

    #[error("productName must not be empty")]
    EmptyProductName,

    #[error("quantity must be greater than 0, got {0}")]
    InvalidQuantity(i32),

    #[error("unitPrice must not be negative, got {0}")]
    NegativeUnitPrice(Decimal),
}

impl ValidationError {
    /// Wire name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyCustomerName => "customerName",
            ValidationError::EmptyItems => "items",
            ValidationError::EmptyProductName => "productName",
            ValidationError::InvalidQuantity(_) => "quantity",
            ValidationError::NegativeUnitPrice(_) => "unitPrice",
        }
    }
}

// ============================================================================
// Lifecycle Errors - what callers of the service see
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid order: {0}")]
    Validation(#[from] ValidationError),

    #[error("order not found: {0}")]
    NotFound(String),

    #[error("order already exists: {0}")]
    Conflict(String),

    #[error("order {id} cannot be edited while {status}")]
    EditForbidden { id: String, status: OrderStatus },

    /// The order is persisted; only the broker hand-off failed.
    #[error("order persisted but not delivered: {source}")]
    Delivery {
        order: Box<Order>,
        #[source]
        source: DeliveryError,
    },

    #[error("order store failure: {0}")]
    Storage(String),
}

impl LifecycleError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::Conflict(_) => "conflict",
            LifecycleError::EditForbidden { .. } => "edit_forbidden",
            LifecycleError::Delivery { .. } => "delivery",
            LifecycleError::Storage(_) => "storage",
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => LifecycleError::Conflict(id),
            StoreError::NotFound(id) => LifecycleError::NotFound(id),
            other => LifecycleError::Storage(other.to_string()),
        }
    }
}
