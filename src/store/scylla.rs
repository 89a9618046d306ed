use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::response::query_result::QueryResult;
use scylla::value::{CqlValue, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::health::HealthStatus;

// ============================================================================
// ScyllaDB document store
// ============================================================================
//
// Each order is one row: the native `uuid` key plus the order body as a JSON
// document. The domain id is the hyphenated text form of the key and never
// appears inside the document, so the two cannot drift apart.
//
// Writes use lightweight transactions:
// - add:    INSERT ... IF NOT EXISTS  -> Conflict when not applied
// - update: UPDATE ... IF EXISTS      -> NotFound when not applied
//
// ============================================================================

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS orders (
    id uuid PRIMARY KEY,
    document text,
    created_at timestamp
)";

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

/// Order body as stored; identity lives in the row key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDocument {
    customer_name: String,
    table: String,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    status: OrderStatus,
}

impl OrderDocument {
    fn from_order(order: &Order) -> Self {
        Self {
            customer_name: order.customer_name.clone(),
            table: order.table.clone(),
            items: order.items.clone(),
            created_at: order.created_at,
            status: order.status,
        }
    }

    fn into_order(self, id: Uuid) -> Order {
        Order {
            id: domain_id(id),
            customer_name: self.customer_name,
            table: self.table,
            items: self.items,
            created_at: self.created_at,
            status: self.status,
        }
    }
}

/// Native key -> domain id.
fn domain_id(id: Uuid) -> String {
    id.hyphenated().to_string()
}

/// Domain id -> native key. Only the canonical text form maps back, which
/// keeps the translation one-to-one.
fn native_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id)
        .ok()
        .filter(|parsed| domain_id(*parsed) == id)
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Reads the `[applied]` flag of a lightweight-transaction response.
fn lwt_applied(result: QueryResult) -> Result<bool, StoreError> {
    let rows = result.into_rows_result().map_err(backend)?;
    let first = rows.maybe_first_row::<Row>().map_err(backend)?;

    match first.and_then(|row| row.columns.into_iter().next().flatten()) {
        Some(CqlValue::Boolean(applied)) => Ok(applied),
        other => Err(StoreError::Backend(format!(
            "unexpected [applied] column in LWT response: {:?}",
            other
        ))),
    }
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Connects, ensures keyspace and table, and returns a ready store.
    pub async fn connect(known_node: &str, keyspace: &str) -> Result<Self, StoreError> {
        tracing::info!(node = %known_node, keyspace = %keyspace, "Connecting to ScyllaDB...");

        let session: Session = SessionBuilder::new()
            .known_node(known_node)
            .build()
            .await
            .map_err(backend)?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(backend)?;

        session.use_keyspace(keyspace, false).await.map_err(backend)?;
        session.query_unpaged(CREATE_TABLE, &[]).await.map_err(backend)?;

        tracing::info!(keyspace = %keyspace, "✅ ScyllaDB order store ready");
        Ok(Self::new(Arc::new(session)))
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn add(&self, mut order: Order) -> Result<Order, StoreError> {
        let key = if order.id.is_empty() {
            let assigned = Uuid::now_v7();
            order.id = domain_id(assigned);
            tracing::debug!(order_id = %order.id, "Assigned document identity");
            assigned
        } else {
            native_id(&order.id).ok_or_else(|| StoreError::InvalidId(order.id.clone()))?
        };

        let document = serde_json::to_string(&OrderDocument::from_order(&order))?;

        let result = self
            .session
            .query_unpaged(
                "INSERT INTO orders (id, document, created_at) VALUES (?, ?, ?) IF NOT EXISTS",
                (key, document, order.created_at),
            )
            .await
            .map_err(backend)?;

        if !lwt_applied(result)? {
            return Err(StoreError::Conflict(order.id));
        }

        tracing::debug!(order_id = %order.id, "Inserted order document");
        Ok(order)
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let Some(key) = native_id(id) else {
            return Ok(None);
        };

        let result = self
            .session
            .query_unpaged("SELECT id, document FROM orders WHERE id = ?", (key,))
            .await
            .map_err(backend)?;

        let rows = result.into_rows_result().map_err(backend)?;
        match rows.maybe_first_row::<(Uuid, String)>().map_err(backend)? {
            Some((key, document)) => {
                let document: OrderDocument = serde_json::from_str(&document)?;
                Ok(Some(document.into_order(key)))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, id: &str, order: Order) -> Result<(), StoreError> {
        let key = native_id(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let document = serde_json::to_string(&OrderDocument::from_order(&order))?;

        let result = self
            .session
            .query_unpaged(
                "UPDATE orders SET document = ?, created_at = ? WHERE id = ? IF EXISTS",
                (document, order.created_at, key),
            )
            .await
            .map_err(backend)?;

        if !lwt_applied(result)? {
            return Err(StoreError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let result = self
            .session
            .query_unpaged("SELECT id, document FROM orders", &[])
            .await
            .map_err(backend)?;

        let rows = result.into_rows_result().map_err(backend)?;

        let mut orders = Vec::new();
        for row in rows.rows::<(Uuid, String)>().map_err(backend)? {
            let (key, document) = row.map_err(backend)?;
            let document: OrderDocument = serde_json::from_str(&document)?;
            orders.push(document.into_order(key));
        }

        tracing::debug!(count = orders.len(), "Listed order documents");
        Ok(orders)
    }

    fn backend_name(&self) -> &'static str {
        "scylla"
    }

    async fn health(&self) -> HealthStatus {
        match self
            .session
            .query_unpaged("SELECT now() FROM system.local", &[])
            .await
        {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => {
                tracing::warn!(error = %e, "ScyllaDB health query failed");
                HealthStatus::Unhealthy(format!("scylla unreachable: {}", e))
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Round trips against a live cluster belong to integration runs; these cover
// the identity translation and document shape.
//
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderIntent;
    use rust_decimal::Decimal;

    fn sample(id: &str) -> Order {
        let intent = OrderIntent::new(
            "Cliente Scylla",
            "Mesa 5",
            vec![OrderItem::new("Producto Test", 1, Decimal::from(1000)).unwrap()],
        )
        .unwrap();
        Order::from_intent(id, intent, Utc::now())
    }

    #[test]
    fn test_identity_translation_round_trips() {
        let key = Uuid::new_v4();
        let id = domain_id(key);
        assert_eq!(native_id(&id), Some(key));
    }

    #[test]
    fn test_non_canonical_ids_do_not_map() {
        let key = Uuid::new_v4();
        assert_eq!(native_id(&key.simple().to_string()), None);
        assert_eq!(native_id(&domain_id(key).to_uppercase()), None);
        assert_eq!(native_id("does-not-exist"), None);
        assert_eq!(native_id(""), None);
    }

    #[test]
    fn test_document_excludes_identity() {
        let order = sample(&domain_id(Uuid::new_v4()));
        let json = serde_json::to_value(OrderDocument::from_order(&order)).unwrap();

        assert!(json.get("id").is_none());
        assert!(json.get("_id").is_none());
        assert_eq!(json["customerName"], "Cliente Scylla");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_document_rebuilds_order_with_row_key() {
        let key = Uuid::new_v4();
        let order = sample(&domain_id(key));

        let text = serde_json::to_string(&OrderDocument::from_order(&order)).unwrap();
        let document: OrderDocument = serde_json::from_str(&text).unwrap();
        let rebuilt = document.into_order(key);

        assert_eq!(rebuilt, order);
    }

    #[tokio::test]
    #[ignore] // Requires a running ScyllaDB node (SCYLLA_NODE, default 127.0.0.1:9042)
    async fn test_live_round_trip_and_health() {
        let node = std::env::var("SCYLLA_NODE").unwrap_or_else(|_| "127.0.0.1:9042".to_string());
        let store = ScyllaOrderStore::connect(&node, "orders_test_ks").await.unwrap();

        assert_eq!(store.health().await, HealthStatus::Healthy);

        let stored = store.add(sample("")).await.unwrap();
        assert!(native_id(&stored.id).is_some());
        assert_eq!(store.get(&stored.id).await.unwrap(), Some(stored.clone()));

        let listed = store.list().await.unwrap();
        assert!(listed.contains(&stored));
    }
}
