use actix::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orders_producer::config::{PublisherBackend, Settings, StoreBackend};
use orders_producer::domain::order::{
    LifecycleError, OrderIntent, OrderItem, OrderLifecycleService, OrderLocks, OrderStatus,
};
use orders_producer::health::HealthMonitorActor;
use orders_producer::messaging::{AmqpPublisher, InMemoryPublisher, OrderPublisher};
use orders_producer::metrics::{self, Metrics};
use orders_producer::redelivery::RedeliveryActor;
use orders_producer::store::{InMemoryOrderStore, OrderStore, ScyllaOrderStore};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG (e.g. RUST_LOG=debug cargo run)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orders_producer=debug")),
        )
        .init();

    tracing::info!("🚀 Starting orders producer");

    // === 1. Settings ===
    let settings = Settings::from_env()?;
    tracing::info!(settings = ?settings, "Configuration loaded");

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Order store ===
    let store: Arc<dyn OrderStore> = match settings.store_backend {
        StoreBackend::Memory => Arc::new(InMemoryOrderStore::new()),
        StoreBackend::Scylla => {
            Arc::new(ScyllaOrderStore::connect(&settings.scylla_node, &settings.keyspace).await?)
        }
    };
    tracing::info!(backend = store.backend_name(), "Order store ready");

    // === 4. Publisher (long-lived broker connection, opened lazily if the broker is down) ===
    let publisher: Arc<dyn OrderPublisher> = match settings.publisher_backend {
        PublisherBackend::Amqp => Arc::new(
            AmqpPublisher::connect(settings.publisher_config(), Some(metrics.clone())).await,
        ),
        PublisherBackend::Memory => Arc::new(InMemoryPublisher::new(settings.orders_queue.clone())),
    };

    // === 5. Actors ===
    // One lock registry shared by the service and redelivery
    let locks = OrderLocks::new();
    let health = HealthMonitorActor::new(publisher.clone(), store.clone(), HEALTH_POLL_INTERVAL).start();
    let redelivery = RedeliveryActor::new(store.clone(), publisher.clone(), settings.redelivery_interval)
        .with_metrics(metrics.clone())
        .with_locks(locks.clone())
        .start();

    // === 6. Metrics / health HTTP server ===
    let registry = metrics.registry().clone();
    let metrics_port = settings.metrics_port;
    let health_addr = health.clone();
    actix::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(registry, health_addr, metrics_port).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 7. Lifecycle service ===
    let service = OrderLifecycleService::new(store.clone(), publisher.clone())
        .with_metrics(metrics.clone())
        .with_locks(locks)
        .with_redelivery(redelivery.clone());

    if settings.run_demo {
        if let Err(e) = demonstrate_lifecycle(&service).await {
            tracing::error!(error = %e, kind = e.kind(), "Lifecycle demonstration stopped");
        }
    }

    tracing::info!("⏳ Running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    if let Err(e) = publisher.close().await {
        tracing::warn!(error = %e, "Publisher did not close cleanly");
    }
    System::current().stop();

    Ok(())
}

/// Walks one order through create, edit, kitchen acceptance and a rejected edit.
async fn demonstrate_lifecycle(service: &OrderLifecycleService) -> Result<(), LifecycleError> {
    tracing::info!("📝 Demonstrating order lifecycle");

    let intent = OrderIntent::new(
        "  Juan ",
        "5",
        vec![OrderItem::new("Pizza", 1, Decimal::from(20000))?],
    )?;
    let order = match service.create(intent).await {
        Ok(order) => order,
        // Persisted anyway; the redelivery actor picks it up
        Err(LifecycleError::Delivery { order, source }) => {
            tracing::warn!(order_id = %order.id, error = %source, "Order created but not yet delivered");
            *order
        }
        Err(e) => return Err(e),
    };
    tracing::info!("✅ Order created: {}", order.id);

    let edit = OrderIntent::new(
        "Juan",
        "5",
        vec![
            OrderItem::new("Pizza", 2, Decimal::from(20000))?,
            OrderItem::new("Refresco", 2, Decimal::from(3000))?,
        ],
    )?;
    match service.update(&order.id, edit).await {
        Ok(updated) => tracing::info!("✅ Order updated: {} ({} items)", updated.id, updated.items.len()),
        Err(LifecycleError::Delivery { source, .. }) => {
            tracing::warn!(order_id = %order.id, error = %source, "Order updated but not yet delivered")
        }
        Err(e) => return Err(e),
    }

    match service.set_status(&order.id, OrderStatus::Preparing).await {
        Ok(_) | Err(LifecycleError::Delivery { .. }) => {
            tracing::info!("👨‍🍳 Kitchen accepted order: {}", order.id)
        }
        Err(e) => return Err(e),
    }

    let late_edit = OrderIntent::new(
        "Juan",
        "5",
        vec![OrderItem::new("Lasagna", 1, Decimal::from(25000))?],
    )?;
    match service.update(&order.id, late_edit).await {
        Err(e @ LifecycleError::EditForbidden { .. }) => tracing::info!("✅ Edit rejected as expected: {}", e),
        other => tracing::warn!(result = ?other.map(|o| o.id), "Edit of a preparing order was not rejected"),
    }

    tracing::info!("🎉 Demo complete, {} order(s) stored", service.list().await?.len());
    Ok(())
}
