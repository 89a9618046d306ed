use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::LifecycleError;
use super::intent::OrderIntent;
use super::value_objects::{OrderItem, OrderStatus};

// ============================================================================
// Order - the persisted entity and the published snapshot
// ============================================================================
//
// Field names are part of the kitchen contract: the consumer parses the
// published JSON by name, so the serde renames below must not change.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity, assigned once
    pub id: String,

    // Caller-supplied contents
    pub customer_name: String,
    pub table: String,
    pub items: Vec<OrderItem>,

    // Audit / lifecycle
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    /// New pending order from a validated intent.
    pub fn from_intent(id: impl Into<String>, intent: OrderIntent, created_at: DateTime<Utc>) -> Self {
        let (customer_name, table, items) = intent.into_parts();
        Self {
            id: id.into(),
            customer_name,
            table,
            items,
            created_at,
            status: OrderStatus::Pending,
        }
    }

    /// Rejects edits while the kitchen is preparing the order.
    pub fn ensure_editable(&self) -> Result<(), LifecycleError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(LifecycleError::EditForbidden {
                id: self.id.clone(),
                status: self.status,
            })
        }
    }

    /// Full replacement keeping identity, creation time and status.
    pub fn with_contents(&self, intent: OrderIntent) -> Self {
        let (customer_name, table, items) = intent.into_parts();
        Self {
            id: self.id.clone(),
            customer_name,
            table,
            items,
            created_at: self.created_at,
            status: self.status,
        }
    }

    /// Status moves are unrestricted here; regression is allowed.
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
