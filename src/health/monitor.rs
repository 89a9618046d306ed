use actix::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{ComponentHealth, HealthStatus};
use crate::messaging::OrderPublisher;
use crate::store::OrderStore;

// ============================================================================
// Health Monitor Actor
// ============================================================================
//
// Responsibilities:
// - Keep the last reported status of every component
// - Poll the broker publisher and the order store on an interval
// - Fold everything into one system status for /health
//
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

#[derive(Message)]
#[rtype(result = "SystemHealth")]
pub struct GetSystemHealth;

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

pub struct HealthMonitorActor {
    components: HashMap<String, ComponentHealth>,
    publisher: Option<Arc<dyn OrderPublisher>>,
    store: Option<Arc<dyn OrderStore>>,
    poll_interval: Duration,
}

impl HealthMonitorActor {
    pub fn new(
        publisher: Arc<dyn OrderPublisher>,
        store: Arc<dyn OrderStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            components: HashMap::new(),
            publisher: Some(publisher),
            store: Some(store),
            poll_interval,
        }
    }

    /// Monitor with nothing to poll; components report themselves.
    pub fn passive() -> Self {
        Self {
            components: HashMap::new(),
            publisher: None,
            store: None,
            poll_interval: Duration::from_secs(10),
        }
    }

    fn compute_overall_status(&self) -> HealthStatus {
        let mut has_degraded = false;
        let mut unhealthy_components = Vec::new();

        for (name, health) in &self.components {
            match &health.status {
                HealthStatus::Unhealthy(msg) => {
                    unhealthy_components.push(format!("{}: {}", name, msg));
                }
                HealthStatus::Degraded(_) => has_degraded = true,
                HealthStatus::Healthy => {}
            }
        }

        if !unhealthy_components.is_empty() {
            unhealthy_components.sort();
            HealthStatus::Unhealthy(unhealthy_components.join(", "))
        } else if has_degraded {
            HealthStatus::Degraded("Some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        }
    }
}

impl Actor for HealthMonitorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor started");

        let addr = ctx.address();

        ctx.run_interval(self.poll_interval, move |act, _ctx| {
            if let Some(publisher) = act.publisher.clone() {
                let addr = addr.clone();
                actix::spawn(async move {
                    let status = publisher.health().await;
                    addr.do_send(UpdateHealth {
                        component: "broker".to_string(),
                        status,
                        details: Some(format!("queue {}", publisher.destination())),
                    });
                });
            }

            if let Some(store) = act.store.clone() {
                let addr = addr.clone();
                actix::spawn(async move {
                    let status = store.health().await;
                    addr.do_send(UpdateHealth {
                        component: "store".to_string(),
                        status,
                        details: Some(format!("backend {}", store.backend_name())),
                    });
                });
            }
        });
    }
}

impl Handler<UpdateHealth> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, msg: UpdateHealth, _: &mut Self::Context) {
        if !msg.status.is_healthy() {
            tracing::warn!(component = %msg.component, status = ?msg.status, "Component not healthy");
        } else {
            tracing::debug!(component = %msg.component, "Component healthy");
        }

        let mut health = ComponentHealth::new(msg.component.clone(), msg.status);
        health.details = msg.details;
        self.components.insert(msg.component, health);
    }
}

impl Handler<GetSystemHealth> for HealthMonitorActor {
    type Result = MessageResult<GetSystemHealth>;

    fn handle(&mut self, _msg: GetSystemHealth, _: &mut Self::Context) -> Self::Result {
        MessageResult(SystemHealth {
            overall_status: self.compute_overall_status(),
            components: self.components.clone(),
            check_time: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Order;
    use crate::messaging::InMemoryPublisher;
    use crate::store::{InMemoryOrderStore, StoreError};
    use async_trait::async_trait;

    /// Store whose backend never answers.
    struct DownStore;

    #[async_trait]
    impl OrderStore for DownStore {
        async fn add(&self, _order: Order) -> Result<Order, StoreError> {
            Err(StoreError::Backend("down".into()))
        }

        async fn get(&self, _id: &str) -> Result<Option<Order>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }

        async fn update(&self, _id: &str, _order: Order) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }

        async fn list(&self) -> Result<Vec<Order>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }

        fn backend_name(&self) -> &'static str {
            "down"
        }

        async fn health(&self) -> HealthStatus {
            HealthStatus::Unhealthy("node unreachable".into())
        }
    }

    #[actix::test]
    async fn test_empty_monitor_is_healthy() {
        let monitor = HealthMonitorActor::passive().start();
        let health = monitor.send(GetSystemHealth).await.unwrap();

        assert!(health.overall_status.is_healthy());
        assert!(health.components.is_empty());
    }

    #[actix::test]
    async fn test_unhealthy_component_dominates() {
        let monitor = HealthMonitorActor::passive().start();

        monitor.do_send(UpdateHealth {
            component: "store".into(),
            status: HealthStatus::Healthy,
            details: None,
        });
        monitor.do_send(UpdateHealth {
            component: "broker".into(),
            status: HealthStatus::Degraded("reconnecting".into()),
            details: None,
        });
        let health = monitor.send(GetSystemHealth).await.unwrap();
        assert!(matches!(health.overall_status, HealthStatus::Degraded(_)));

        monitor.do_send(UpdateHealth {
            component: "broker".into(),
            status: HealthStatus::Unhealthy("connection refused".into()),
            details: None,
        });
        let health = monitor.send(GetSystemHealth).await.unwrap();
        assert_eq!(
            health.overall_status,
            HealthStatus::Unhealthy("broker: connection refused".into())
        );
    }

    #[actix::test]
    async fn test_polls_publisher_health() {
        let publisher = Arc::new(InMemoryPublisher::new("orders.new"));
        publisher.set_available(false);

        let store = Arc::new(InMemoryOrderStore::new());
        let monitor = HealthMonitorActor::new(publisher, store, Duration::from_millis(20)).start();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let health = monitor.send(GetSystemHealth).await.unwrap();
        let broker = health.components.get("broker").unwrap();
        assert!(!broker.status.is_healthy());
        assert_eq!(broker.details.as_deref(), Some("queue orders.new"));

        let store = health.components.get("store").unwrap();
        assert!(store.status.is_healthy());
        assert_eq!(store.details.as_deref(), Some("backend memory"));
    }

    #[actix::test]
    async fn test_polls_store_health() {
        let publisher = Arc::new(InMemoryPublisher::new("orders.new"));
        let monitor =
            HealthMonitorActor::new(publisher, Arc::new(DownStore), Duration::from_millis(20)).start();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let health = monitor.send(GetSystemHealth).await.unwrap();
        assert_eq!(
            health.overall_status,
            HealthStatus::Unhealthy("store: node unreachable".into())
        );
        assert_eq!(
            health.components.get("store").unwrap().details.as_deref(),
            Some("backend down")
        );
    }
}
