use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// A single line of an order. Immutable once built; every instance satisfies
/// `quantity > 0`, `unit_price >= 0` and a non-blank product name.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "OrderItemPayload")]
pub struct OrderItem {
    product_name: String,
    quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
}

impl OrderItem {
    pub fn new(
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<Self, ValidationError> {
        let product_name = product_name.into();

        if product_name.trim().is_empty() {
            return Err(ValidationError::EmptyProductName);
        }
        if quantity <= 0 {
            return Err(ValidationError::InvalidQuantity(quantity));
        }
        if unit_price < Decimal::ZERO {
            return Err(ValidationError::NegativeUnitPrice(unit_price));
        }

        Ok(Self {
            product_name,
            quantity,
            unit_price,
        })
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

/// Unvalidated wire shape; only reachable through `TryFrom`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderItemPayload {
    product_name: String,
    quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
}

impl TryFrom<OrderItemPayload> for OrderItem {
    type Error = ValidationError;

    fn try_from(payload: OrderItemPayload) -> Result<Self, Self::Error> {
        OrderItem::new(payload.product_name, payload.quantity, payload.unit_price)
    }
}

/// Kitchen-facing lifecycle: pending -> preparing -> ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
}

impl OrderStatus {
    /// Only an order the kitchen is actively working on is locked.
    pub fn is_editable(&self) -> bool {
        !matches!(self, OrderStatus::Preparing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
