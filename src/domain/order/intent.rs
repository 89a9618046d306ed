use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::value_objects::OrderItem;

// ============================================================================
// Order Intent - what a caller asks for, before identity is assigned
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "OrderIntentPayload")]
pub struct OrderIntent {
    customer_name: String,
    table: String,
    items: Vec<OrderItem>,
}

impl OrderIntent {
    /// Builds a validated intent. The stored customer name is the trimmed one.
    pub fn new(
        customer_name: impl AsRef<str>,
        table: impl Into<String>,
        items: Vec<OrderItem>,
    ) -> Result<Self, ValidationError> {
        let customer_name = customer_name.as_ref().trim();
        if customer_name.is_empty() {
            return Err(ValidationError::EmptyCustomerName);
        }
        if items.is_empty() {
            return Err(ValidationError::EmptyItems);
        }

        Ok(Self {
            customer_name: customer_name.to_string(),
            table: table.into(),
            items,
        })
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub(crate) fn into_parts(self) -> (String, String, Vec<OrderItem>) {
        (self.customer_name, self.table, self.items)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderIntentPayload {
    customer_name: String,
    table: String,
    items: Vec<OrderItem>,
}

impl TryFrom<OrderIntentPayload> for OrderIntent {
    type Error = ValidationError;

    fn try_from(payload: OrderIntentPayload) -> Result<Self, Self::Error> {
        OrderIntent::new(payload.customer_name, payload.table, payload.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn burger() -> OrderItem {
        OrderItem::new("Hamburguesa", 2, Decimal::from(10000)).unwrap()
    }

    #[test]
    fn test_customer_name_is_trimmed() {
        let intent = OrderIntent::new("  Juan Pérez  ", "Mesa 1", vec![burger()]).unwrap();
        assert_eq!(intent.customer_name(), "Juan Pérez");
        assert_eq!(intent.table(), "Mesa 1");
    }

    #[test]
    fn test_empty_customer_name_rejected() {
        let err = OrderIntent::new("", "Mesa 1", vec![burger()]).unwrap_err();
        assert_eq!(err, ValidationError::EmptyCustomerName);
    }

    #[test]
    fn test_whitespace_customer_name_rejected() {
        let err = OrderIntent::new(" \t\n ", "Mesa 1", vec![burger()]).unwrap_err();
        assert_eq!(err.field(), "customerName");
    }

    #[test]
    fn test_empty_items_rejected() {
        let err = OrderIntent::new("Test", "Mesa 1", vec![]).unwrap_err();
        assert_eq!(err, ValidationError::EmptyItems);
    }

    #[test]
    fn test_payload_parsing_applies_rules() {
        let intent: OrderIntent = serde_json::from_str(
            r#"{"customerName":"  Juan ","table":"5","items":[{"productName":"Pizza","quantity":1,"unitPrice":20000}]}"#,
        )
        .unwrap();
        assert_eq!(intent.customer_name(), "Juan");
        assert_eq!(intent.items().len(), 1);

        let empty = serde_json::from_str::<OrderIntent>(
            r#"{"customerName":"Cliente API","table":"Mesa 10","items":[]}"#,
        );
        assert!(empty.is_err());
    }
}
