use std::sync::Arc;

use actix::Addr;
use chrono::Utc;
use uuid::Uuid;

use super::aggregate::Order;
use super::errors::LifecycleError;
use super::intent::OrderIntent;
use super::locks::OrderLocks;
use super::value_objects::OrderStatus;
use crate::messaging::OrderPublisher;
use crate::metrics::Metrics;
use crate::redelivery::{DeliveryConfirmed, RedeliveryActor, ScheduleRedelivery};
use crate::store::OrderStore;

// ============================================================================
// Order Lifecycle Service
// ============================================================================
//
// Orchestrates: Intent → Order → Store → Publisher
//
// - Persistence always happens before publishing and is never rolled back.
//   A failed publish comes back as LifecycleError::Delivery carrying the
//   persisted snapshot, and is handed to the redelivery actor if one is set.
// - Every operation that writes or publishes an order holds that order's
//   lock from the read to the publish. The lock registry is shared with the
//   redelivery actor so the queue sees snapshots in store order.
//   Different ids never contend.
//
// ============================================================================

pub struct OrderLifecycleService {
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn OrderPublisher>,
    locks: Arc<OrderLocks>,
    metrics: Option<Arc<Metrics>>,
    redelivery: Option<Addr<RedeliveryActor>>,
}

impl OrderLifecycleService {
    pub fn new(store: Arc<dyn OrderStore>, publisher: Arc<dyn OrderPublisher>) -> Self {
        Self {
            store,
            publisher,
            locks: OrderLocks::new(),
            metrics: None,
            redelivery: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Shares the per-order locks with another writer, such as the redelivery actor.
    pub fn with_locks(mut self, locks: Arc<OrderLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_redelivery(mut self, redelivery: Addr<RedeliveryActor>) -> Self {
        self.redelivery = Some(redelivery);
        self
    }

    /// Persists a new pending order, then publishes it.
    pub async fn create(&self, intent: OrderIntent) -> Result<Order, LifecycleError> {
        let order = Order::from_intent(Uuid::new_v4().to_string(), intent, Utc::now());
        // The id is visible through list() before the publish lands
        let _guard = self.locks.lock(&order.id).await;

        // Identity-assigning backends may hand back a different id
        let stored = self
            .store
            .add(order)
            .await
            .map_err(|e| self.failed("create", e.into()))?;

        if let Some(metrics) = &self.metrics {
            metrics.orders_created.inc();
        }
        tracing::info!(
            order_id = %stored.id,
            customer = %stored.customer_name,
            table = %stored.table,
            items = stored.items.len(),
            backend = self.store.backend_name(),
            "🆕 Order created"
        );

        self.deliver("create", stored).await
    }

    /// `Ok(None)` for an unknown id.
    pub async fn get(&self, id: &str) -> Result<Option<Order>, LifecycleError> {
        self.store
            .get(id)
            .await
            .map_err(|e| self.failed("get", e.into()))
    }

    /// All orders, oldest first.
    pub async fn list(&self) -> Result<Vec<Order>, LifecycleError> {
        let mut orders = self
            .store
            .list()
            .await
            .map_err(|e| self.failed("list", e.into()))?;
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }

    /// Replaces the contents of an order that is not being prepared.
    /// Identity, creation time and status are kept.
    pub async fn update(&self, id: &str, intent: OrderIntent) -> Result<Order, LifecycleError> {
        let _guard = self.locks.lock(id).await;
        self.update_locked(id, intent)
            .await
            .map_err(|e| self.failed("update", e))
    }

    async fn update_locked(&self, id: &str, intent: OrderIntent) -> Result<Order, LifecycleError> {
        let existing = self.load(id).await?;

        if let Err(e) = existing.ensure_editable() {
            tracing::warn!(order_id = %id, status = %existing.status, "✋ Edit rejected, order is being prepared");
            return Err(e);
        }

        let updated = existing.with_contents(intent);
        self.store.update(id, updated.clone()).await?;

        if let Some(metrics) = &self.metrics {
            metrics.orders_updated.inc();
        }
        tracing::info!(
            order_id = %id,
            items = updated.items.len(),
            status = %updated.status,
            "✏️ Order updated"
        );

        self.publish_snapshot(updated).await
    }

    /// Moves an order to `status`. Any move is allowed, backwards included.
    pub async fn set_status(&self, id: &str, status: OrderStatus) -> Result<Order, LifecycleError> {
        let _guard = self.locks.lock(id).await;
        self.set_status_locked(id, status)
            .await
            .map_err(|e| self.failed("set_status", e))
    }

    async fn set_status_locked(&self, id: &str, status: OrderStatus) -> Result<Order, LifecycleError> {
        let existing = self.load(id).await?;
        let previous = existing.status;

        let updated = existing.with_status(status);
        self.store.update(id, updated.clone()).await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_status_change(status.as_str());
        }
        tracing::info!(order_id = %id, from = %previous, to = %status, "🔄 Order status changed");

        self.publish_snapshot(updated).await
    }

    /// Publishes the stored snapshot again.
    pub async fn republish(&self, id: &str) -> Result<Order, LifecycleError> {
        let _guard = self.locks.lock(id).await;
        let order = self.load(id).await.map_err(|e| self.failed("republish", e))?;
        tracing::info!(order_id = %id, "Republishing order snapshot");
        self.deliver("republish", order).await
    }

    async fn load(&self, id: &str) -> Result<Order, LifecycleError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))
    }

    async fn deliver(&self, operation: &str, order: Order) -> Result<Order, LifecycleError> {
        self.publish_snapshot(order)
            .await
            .map_err(|e| self.failed(operation, e))
    }

    /// Publish step shared by every mutating operation. Failure metrics are
    /// left to the caller so each failure is counted once.
    async fn publish_snapshot(&self, order: Order) -> Result<Order, LifecycleError> {
        match self.publisher.publish(&order).await {
            Ok(()) => {
                if let Some(redelivery) = &self.redelivery {
                    redelivery.do_send(DeliveryConfirmed {
                        order_id: order.id.clone(),
                    });
                }
                Ok(order)
            }
            Err(source) => {
                tracing::error!(
                    order_id = %order.id,
                    queue = %self.publisher.destination(),
                    error = %source,
                    "Order persisted but not delivered"
                );
                if let Some(redelivery) = &self.redelivery {
                    redelivery.do_send(ScheduleRedelivery {
                        order_id: order.id.clone(),
                        error_message: source.to_string(),
                        failed_at: Utc::now(),
                    });
                }
                Err(LifecycleError::Delivery {
                    order: Box::new(order),
                    source,
                })
            }
        }
    }

    fn failed(&self, operation: &str, err: LifecycleError) -> LifecycleError {
        if let Some(metrics) = &self.metrics {
            metrics.record_operation_failure(operation, err.kind());
        }
        tracing::debug!(operation = operation, reason = err.kind(), error = %err, "Lifecycle operation failed");
        err
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
