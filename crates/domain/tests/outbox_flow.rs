//! Write-side flow: mutate a source, register its event, relay it to the bus.

use chrono::Utc;
use common::{AgentId, DeliveryId, DispatchId, Money, OrderId};
use domain::{
    Delivery, DeliveryEventKind, DeliveryPayloadGenerator, Dispatch, DispatchEventKind,
    DispatchPayloadGenerator, Order, OrderEventKind, OrderPayloadGenerator,
};
use event_bus::InMemoryBus;
use events::{EventEnvelope, EventTopic, EventType, OrderItem, OrderLocation};
use outbox::{InMemoryOutboxStore, OutboxAppender, OutboxPublisher, OutboxStatus, OutboxStore};

fn location(name: &str) -> OrderLocation {
    OrderLocation {
        contact_name: name.to_string(),
        contact_phone_number: "010-0000-0000".to_string(),
        latitude: 37.5,
        longitude: 127.0,
        jibun_address: "jibun".to_string(),
        road_address: "road".to_string(),
        detail_address: Some("101".to_string()),
    }
}

fn new_order(id: i64) -> Order {
    Order::create(
        OrderId::new(id),
        format!("ORD-{id}"),
        location("store"),
        location("customer"),
        vec![OrderItem {
            item_name: "pizza".to_string(),
            quantity: 1,
            price: Money::new(18000),
        }],
        Utc::now(),
    )
    .unwrap()
}

#[tokio::test]
async fn order_lifecycle_reaches_every_topic() {
    let store = InMemoryOutboxStore::new();
    let bus = InMemoryBus::new();

    // Order service
    let order = new_order(42);
    let mut tx = store.begin();
    OutboxAppender::new(OrderPayloadGenerator)
        .append(&mut tx, OrderEventKind::Created, &order)
        .await
        .unwrap();
    tx.commit().await;

    // Dispatch service
    let mut dispatch = Dispatch::request(DispatchId::new(10), order.id(), Utc::now());
    let appender = OutboxAppender::new(DispatchPayloadGenerator);
    let mut tx = store.begin();
    appender
        .append(&mut tx, DispatchEventKind::Requested, &dispatch)
        .await
        .unwrap();
    dispatch
        .dispatch(AgentId::new(7), Money::new(3000), Utc::now())
        .unwrap();
    appender
        .append(&mut tx, DispatchEventKind::Dispatched, &dispatch)
        .await
        .unwrap();
    tx.commit().await;

    // Delivery service
    let delivery = Delivery::start(
        DeliveryId::new(100),
        "DLV-100",
        order.id(),
        AgentId::new(7),
        Money::new(3000),
        Utc::now(),
    );
    let mut tx = store.begin();
    OutboxAppender::new(DeliveryPayloadGenerator)
        .append(&mut tx, DeliveryEventKind::Started, &delivery)
        .await
        .unwrap();
    tx.commit().await;

    let report = OutboxPublisher::new(store.clone(), bus.clone())
        .publish(10)
        .await
        .unwrap();
    assert_eq!(report.published, 4);
    assert_eq!(store.count_by_status(OutboxStatus::Registered).await.unwrap(), 0);

    assert_eq!(bus.published(EventTopic::Order).len(), 1);
    assert_eq!(bus.published(EventTopic::Dispatch).len(), 2);
    assert_eq!(bus.published(EventTopic::Delivery).len(), 1);

    let mut dispatch_types: Vec<_> = bus
        .published(EventTopic::Dispatch)
        .iter()
        .map(|msg| EventEnvelope::from_slice(&msg.payload).unwrap().event_type())
        .collect();
    dispatch_types.sort_by_key(|t| t.as_str());
    assert_eq!(
        dispatch_types,
        vec![EventType::DispatchDispatched, EventType::DispatchRequested]
    );
    assert!(
        bus.published(EventTopic::Dispatch)
            .iter()
            .all(|msg| msg.key.as_deref() == Some("10"))
    );
}

#[tokio::test]
async fn failed_generation_registers_nothing() {
    let store = InMemoryOutboxStore::new();
    let order = new_order(1);

    let mut tx = store.begin();
    let result = OutboxAppender::new(OrderPayloadGenerator)
        .append(&mut tx, OrderEventKind::Cancelled, &order)
        .await;
    assert!(matches!(result, Err(outbox::OutboxError::Generation { .. })));
    assert_eq!(tx.staged_count(), 0);
    tx.commit().await;

    assert_eq!(store.record_count().await, 0);
}
