use actix::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::OrderLocks;
use crate::messaging::OrderPublisher;
use crate::metrics::Metrics;
use crate::store::OrderStore;
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};

// ============================================================================
// Redelivery Actor
// ============================================================================
//
// Out-of-band reconciliation for orders that were persisted but not handed
// to the broker:
// - The lifecycle service reports failed publishes (ScheduleRedelivery)
//   and successful ones (DeliveryConfirmed)
// - On every tick the backlog is drained: under the order's lock, the
//   latest stored snapshot is re-read and published with bounded backoff
// - Orders that disappeared from the store, and permanent publish errors,
//   are dropped and logged
//
// Only the latest snapshot is sent, so intermediate states of an order that
// changed while undeliverable are never published.
//
// ============================================================================

pub struct RedeliveryActor {
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn OrderPublisher>,
    locks: Arc<OrderLocks>,
    pending: HashMap<String, PendingDelivery>,
    interval: Duration,
    retry: RetryConfig,
    metrics: Option<Arc<Metrics>>,
    draining: bool,
}

impl RedeliveryActor {
    pub fn new(
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn OrderPublisher>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            locks: OrderLocks::new(),
            pending: HashMap::new(),
            interval,
            retry: RetryConfig::default(),
            metrics: None,
            draining: false,
        }
    }

    /// Must be the registry the lifecycle service writes under.
    pub fn with_locks(mut self, locks: Arc<OrderLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn update_pending_gauge(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.redelivery_pending.set(self.pending.len() as i64);
        }
    }

    fn apply(&mut self, outcomes: Vec<(String, DateTime<Utc>, Attempt)>) -> DrainReport {
        let mut report = DrainReport::default();

        for (order_id, seen_failure, attempt) in outcomes {
            let outcome = attempt.label();
            if let Some(metrics) = &self.metrics {
                metrics.record_redelivery(outcome);
            }

            match attempt {
                Attempt::Delivered => {
                    report.delivered += 1;
                    // A failure reported while draining refers to a newer snapshot
                    let newer_failure = self
                        .pending
                        .get(&order_id)
                        .is_some_and(|entry| entry.last_failed_at > seen_failure);
                    if !newer_failure {
                        self.pending.remove(&order_id);
                    }
                    tracing::info!(order_id = %order_id, "📬 Redelivered order snapshot");
                }
                Attempt::Retained(error) => {
                    report.retained += 1;
                    if let Some(entry) = self.pending.get_mut(&order_id) {
                        entry.failure_count += 1;
                        entry.last_error = error.clone();
                        entry.last_failed_at = Utc::now();
                    }
                    tracing::warn!(order_id = %order_id, error = %error, "Redelivery failed, keeping order pending");
                }
                Attempt::Dropped(reason) => {
                    report.dropped += 1;
                    self.pending.remove(&order_id);
                    tracing::error!(order_id = %order_id, reason = %reason, "💀 Dropping order from redelivery");
                }
            }
        }

        self.update_pending_gauge();
        report
    }
}

impl Actor for RedeliveryActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        if self.interval.is_zero() {
            tracing::info!("RedeliveryActor started - periodic drain disabled");
            return;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "RedeliveryActor started");

        ctx.run_interval(self.interval, |act, ctx| {
            if !act.pending.is_empty() {
                ctx.notify(DrainRedeliveries);
            }
        });
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct ScheduleRedelivery {
    pub order_id: String,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct DeliveryConfirmed {
    pub order_id: String,
}

#[derive(Message)]
#[rtype(result = "DrainReport")]
pub struct DrainRedeliveries;

#[derive(Message)]
#[rtype(result = "Vec<PendingDelivery>")]
pub struct GetPendingDeliveries;

#[derive(Debug, Clone, Serialize)]
pub struct PendingDelivery {
    pub order_id: String,
    pub last_error: String,
    pub failure_count: u32,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub retained: usize,
    pub dropped: usize,
}

enum Attempt {
    Delivered,
    Retained(String),
    Dropped(String),
}

impl Attempt {
    fn label(&self) -> &'static str {
        match self {
            Attempt::Delivered => "delivered",
            Attempt::Retained(_) => "retained",
            Attempt::Dropped(_) => "dropped",
        }
    }
}

async fn redeliver(
    locks: &Arc<OrderLocks>,
    store: &dyn OrderStore,
    publisher: &dyn OrderPublisher,
    retry: &RetryConfig,
    order_id: &str,
) -> Attempt {
    // No update may land between the read and the publish
    let _guard = locks.lock(order_id).await;

    let order = match store.get(order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => return Attempt::Dropped("order no longer exists".to_string()),
        Err(e) => return Attempt::Retained(format!("store read failed: {}", e)),
    };

    let snapshot = &order;
    match retry_on_transient(retry, move |_| publisher.publish(snapshot)).await {
        RetryResult::Success { .. } => Attempt::Delivered,
        RetryResult::Exhausted { error, attempts } => {
            Attempt::Retained(format!("{} (after {} attempts)", error, attempts))
        }
        RetryResult::PermanentFailure { error, .. } => Attempt::Dropped(error.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

impl Handler<ScheduleRedelivery> for RedeliveryActor {
    type Result = ();

    fn handle(&mut self, msg: ScheduleRedelivery, _: &mut Self::Context) {
        let entry = self
            .pending
            .entry(msg.order_id.clone())
            .or_insert_with(|| PendingDelivery {
                order_id: msg.order_id.clone(),
                last_error: String::new(),
                failure_count: 0,
                first_failed_at: msg.failed_at,
                last_failed_at: msg.failed_at,
            });

        entry.failure_count += 1;
        entry.last_error = msg.error_message;
        entry.last_failed_at = msg.failed_at;

        tracing::warn!(
            order_id = %msg.order_id,
            failure_count = entry.failure_count,
            error = %entry.last_error,
            "Order scheduled for redelivery"
        );

        self.update_pending_gauge();
    }
}

impl Handler<DeliveryConfirmed> for RedeliveryActor {
    type Result = ();

    fn handle(&mut self, msg: DeliveryConfirmed, _: &mut Self::Context) {
        if self.pending.remove(&msg.order_id).is_some() {
            tracing::debug!(order_id = %msg.order_id, "Pending redelivery superseded by a successful publish");
            self.update_pending_gauge();
        }
    }
}

impl Handler<DrainRedeliveries> for RedeliveryActor {
    type Result = ResponseActFuture<Self, DrainReport>;

    fn handle(&mut self, _msg: DrainRedeliveries, _: &mut Self::Context) -> Self::Result {
        if self.draining || self.pending.is_empty() {
            return Box::pin(actix::fut::ready(DrainReport::default()));
        }
        self.draining = true;

        let batch: Vec<(String, DateTime<Utc>)> = self
            .pending
            .values()
            .map(|entry| (entry.order_id.clone(), entry.last_failed_at))
            .collect();

        tracing::info!(pending = batch.len(), "🔁 Draining redelivery backlog");

        let store = self.store.clone();
        let publisher = self.publisher.clone();
        let locks = self.locks.clone();
        let retry = self.retry.clone();

        let work = async move {
            let mut outcomes = Vec::with_capacity(batch.len());
            for (order_id, seen_failure) in batch {
                let attempt = redeliver(&locks, store.as_ref(), publisher.as_ref(), &retry, &order_id).await;
                outcomes.push((order_id, seen_failure, attempt));
            }
            outcomes
        };

        Box::pin(work.into_actor(self).map(|outcomes, act, _ctx| {
            act.draining = false;
            act.apply(outcomes)
        }))
    }
}

impl Handler<GetPendingDeliveries> for RedeliveryActor {
    type Result = MessageResult<GetPendingDeliveries>;

    fn handle(&mut self, _msg: GetPendingDeliveries, _: &mut Self::Context) -> Self::Result {
        let mut pending: Vec<PendingDelivery> = self.pending.values().cloned().collect();
        pending.sort_by_key(|entry| entry.first_failed_at);
        MessageResult(pending)
    }
}
