use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{OrderStore, StoreError};
use crate::domain::order::Order;

/// Map-backed store. Ids are taken as given; duplicates are a conflict.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn add(&self, order: Order) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(order.id));
        }

        orders.insert(order.id.clone(), order.clone());
        tracing::debug!(order_id = %order.id, "Stored order in memory");
        Ok(order)
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, order: Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;

        match orders.get_mut(id) {
            Some(slot) => {
                *slot = order;
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.orders.read().await.values().cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderIntent, OrderItem, OrderStatus};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(id: &str, customer: &str) -> Order {
        let intent = OrderIntent::new(
            customer,
            "Mesa 1",
            vec![OrderItem::new("Hamburguesa", 2, Decimal::from(10000)).unwrap()],
        )
        .unwrap();
        Order::from_intent(id, intent, Utc::now())
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = InMemoryOrderStore::new();
        let stored = store.add(order("a", "Cliente")).await.unwrap();

        assert_eq!(stored.id, "a");
        assert_eq!(store.get("a").await.unwrap(), Some(stored));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let store = InMemoryOrderStore::new();
        store.add(order("a", "Uno")).await.unwrap();

        let err = store.add(order("a", "Dos")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref id) if id == "a"));

        // First write wins
        let kept = store.get("a").await.unwrap().unwrap();
        assert_eq!(kept.customer_name, "Uno");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryOrderStore::new();
        assert!(store.get("no-existe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_whole_record() {
        let store = InMemoryOrderStore::new();
        store.add(order("a", "Cliente")).await.unwrap();

        let replacement = order("a", "Editado").with_status(OrderStatus::Preparing);
        store.update("a", replacement.clone()).await.unwrap();

        let fetched = store.get("a").await.unwrap().unwrap();
        assert_eq!(fetched, replacement);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryOrderStore::new();
        let err = store.update("ghost", order("ghost", "X")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_list_returns_everything() {
        let store = InMemoryOrderStore::new();
        store.add(order("a", "Uno")).await.unwrap();
        store.add(order("b", "Dos")).await.unwrap();

        let mut ids: Vec<String> = store.list().await.unwrap().into_iter().map(|o| o.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
