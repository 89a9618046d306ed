use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;

use orders_producer::domain::order::{
    LifecycleError, OrderIntent, OrderItem, OrderLifecycleService, OrderStatus, ValidationError,
};
use orders_producer::messaging::InMemoryPublisher;
use orders_producer::store::{InMemoryOrderStore, OrderStore};

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    service: Arc<OrderLifecycleService>,
    store: Arc<InMemoryOrderStore>,
    publisher: Arc<InMemoryPublisher>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryOrderStore::new());
    let publisher = Arc::new(InMemoryPublisher::new("orders.new"));
    let service = Arc::new(OrderLifecycleService::new(store.clone(), publisher.clone()));
    Harness {
        service,
        store,
        publisher,
    }
}

fn item(product: &str, quantity: i32, unit_price: i64) -> OrderItem {
    OrderItem::new(product, quantity, Decimal::from(unit_price)).unwrap()
}

fn pizza_for_juan() -> OrderIntent {
    OrderIntent::new("Juan", "5", vec![item("Pizza", 1, 20000)]).unwrap()
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn scenario_a_create_returns_pending_trimmed_order() {
    let h = harness();

    let intent = OrderIntent::new("  Juan  ", "5", vec![item("Pizza", 1, 20000)]).unwrap();
    let order = h.service.create(intent).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.customer_name, "Juan");
    assert_eq!(order.table, "5");
    assert_eq!(order.items, vec![item("Pizza", 1, 20000)]);

    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].queue, "orders.new");

    let json: serde_json::Value = serde_json::from_slice(&published[0].payload).unwrap();
    assert_eq!(json["customerName"], "Juan");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["items"][0]["productName"], "Pizza");
    assert_eq!(json["items"][0]["quantity"], 1);
    assert_eq!(json["items"][0]["unitPrice"].as_f64(), Some(20000.0));
}

#[tokio::test]
async fn scenario_b_update_while_pending_keeps_status() {
    let h = harness();
    let created = h.service.create(pizza_for_juan()).await.unwrap();

    let new_items = vec![item("Pizza", 2, 20000), item("Refresco", 2, 3000)];
    let updated = h
        .service
        .update(&created.id, OrderIntent::new("Juan", "5", new_items.clone()).unwrap())
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Pending);
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.items, new_items);
    assert_eq!(h.publisher.published_orders().last(), Some(&updated));
}

#[tokio::test]
async fn scenario_c_preparing_order_rejects_edit() {
    let h = harness();
    let created = h.service.create(pizza_for_juan()).await.unwrap();
    let preparing = h
        .service
        .set_status(&created.id, OrderStatus::Preparing)
        .await
        .unwrap();
    let published_before = h.publisher.published().len();

    let edit = OrderIntent::new("Juan", "5", vec![item("Lasagna", 3, 25000)]).unwrap();
    let err = h.service.update(&created.id, edit).await.unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::EditForbidden { ref id, status: OrderStatus::Preparing } if *id == created.id
    ));
    assert_eq!(h.store.get(&created.id).await.unwrap(), Some(preparing));
    assert_eq!(h.publisher.published().len(), published_before);
}

#[tokio::test]
async fn scenario_d_update_unknown_id_is_not_found() {
    let h = harness();

    let err = h
        .service
        .update("does-not-exist", pizza_for_juan())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::NotFound(ref id) if id == "does-not-exist"));
    assert!(h.publisher.published().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn created_ids_are_unique_and_non_empty() {
    let h = harness();
    let mut ids = HashSet::new();

    for _ in 0..50 {
        let order = h.service.create(pizza_for_juan()).await.unwrap();
        assert!(!order.id.is_empty());
        assert!(ids.insert(order.id));
    }
    assert_eq!(h.store.len().await, 50);
}

#[tokio::test]
async fn get_after_create_returns_same_snapshot() {
    let h = harness();
    let created = h.service.create(pizza_for_juan()).await.unwrap();

    assert_eq!(h.service.get(&created.id).await.unwrap(), Some(created));
    assert_eq!(h.service.get("does-not-exist").await.unwrap(), None);
}

#[tokio::test]
async fn ready_order_is_editable_again() {
    let h = harness();
    let created = h.service.create(pizza_for_juan()).await.unwrap();
    h.service.set_status(&created.id, OrderStatus::Ready).await.unwrap();

    let edit = OrderIntent::new("Juan", "6", vec![item("Postre", 1, 8000)]).unwrap();
    let updated = h.service.update(&created.id, edit).await.unwrap();

    assert_eq!(updated.status, OrderStatus::Ready);
    assert_eq!(updated.table, "6");
}

#[test]
fn invalid_intents_never_reach_the_service() {
    assert_eq!(
        OrderIntent::new("   ", "5", vec![item("Pizza", 1, 20000)]).unwrap_err(),
        ValidationError::EmptyCustomerName
    );
    assert_eq!(
        OrderIntent::new("Juan", "5", vec![]).unwrap_err(),
        ValidationError::EmptyItems
    );
    assert_eq!(
        OrderItem::new("Pizza", 0, Decimal::from(20000)).unwrap_err(),
        ValidationError::InvalidQuantity(0)
    );
    assert_eq!(
        OrderItem::new("Pizza", 1, Decimal::from(-1)).unwrap_err(),
        ValidationError::NegativeUnitPrice(Decimal::from(-1))
    );
    assert!(OrderItem::new("Agua", 1, Decimal::ZERO).is_ok());
}

#[test]
fn intent_payload_is_validated_on_parse() {
    let parsed: Result<OrderIntent, _> = serde_json::from_str(
        r#"{"customerName":"Juan","table":"5","items":[{"productName":"Pizza","quantity":-1,"unitPrice":20000}]}"#,
    );
    assert!(parsed.is_err());

    let parsed: OrderIntent = serde_json::from_str(
        r#"{"customerName":" Juan ","table":"5","items":[{"productName":"Pizza","quantity":1,"unitPrice":20000}]}"#,
    )
    .unwrap();
    assert_eq!(parsed.customer_name(), "Juan");
}

// ============================================================================
// Delivery failures
// ============================================================================

#[tokio::test]
async fn failed_publish_keeps_order_persisted() {
    let h = harness();
    h.publisher.set_available(false);

    let err = h.service.create(pizza_for_juan()).await.unwrap_err();
    let LifecycleError::Delivery { order, .. } = err else {
        panic!("expected delivery error, got {err:?}");
    };

    assert_eq!(h.service.get(&order.id).await.unwrap().as_ref(), Some(order.as_ref()));
    assert!(h.publisher.published().is_empty());

    h.publisher.set_available(true);
    h.service.republish(&order.id).await.unwrap();
    assert_eq!(h.publisher.published_orders(), vec![*order]);
}

#[tokio::test]
async fn failed_publish_on_update_keeps_new_contents() {
    let h = harness();
    let created = h.service.create(pizza_for_juan()).await.unwrap();
    h.publisher.fail_next(1);

    let edit = OrderIntent::new("Juan", "5", vec![item("Pasta", 1, 18000)]).unwrap();
    let err = h.service.update(&created.id, edit).await.unwrap_err();
    assert_eq!(err.kind(), "delivery");

    let stored = h.store.get(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.items, vec![item("Pasta", 1, 18000)]);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_are_serialised_per_order() {
    let h = harness();
    let created = h.service.create(pizza_for_juan()).await.unwrap();

    let mut handles = Vec::new();
    for quantity in 1..=20 {
        let service = h.service.clone();
        let id = created.id.clone();
        handles.push(tokio::spawn(async move {
            let edit = OrderIntent::new("Juan", "5", vec![item("Pizza", quantity, 20000)]).unwrap();
            service.update(&id, edit).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // One snapshot per successful write, and the last one published is what is stored
    let published = h.publisher.published_orders();
    assert_eq!(published.len(), 21);
    let stored = h.store.get(&created.id).await.unwrap().unwrap();
    assert_eq!(published.last(), Some(&stored));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn edit_guard_holds_against_concurrent_status_change() {
    let h = harness();
    let created = h.service.create(pizza_for_juan()).await.unwrap();

    let service = h.service.clone();
    let id = created.id.clone();
    let kitchen = tokio::spawn(async move { service.set_status(&id, OrderStatus::Preparing).await });

    let service = h.service.clone();
    let id = created.id.clone();
    let waiter = tokio::spawn(async move {
        let edit = OrderIntent::new("Juan", "5", vec![item("Lasagna", 1, 25000)]).unwrap();
        service.update(&id, edit).await
    });

    let preparing = kitchen.await.unwrap().unwrap();
    let edit = waiter.await.unwrap();

    let stored = h.store.get(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Preparing);
    match edit {
        // Edit landed first; the kitchen then accepted the edited contents
        Ok(_) => assert_eq!(stored.items, vec![item("Lasagna", 1, 25000)]),
        Err(e) => {
            assert!(matches!(e, LifecycleError::EditForbidden { .. }));
            assert_eq!(stored, preparing);
        }
    }
}
