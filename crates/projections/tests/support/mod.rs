//! Shared fixtures and storage doubles for projection tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{AgentId, DeliveryId, DispatchId, Money, OrderId};
use events::{
    DeliveryStarted, DispatchDispatched, DispatchRequested, EventEnvelope, EventPayload,
    OrderCreated, OrderItem, OrderLocation,
};
use projections::{
    DispatchOrigin, DocumentStore, DeliveryOrigin, InMemoryDocumentStore, MokaProjectionCache,
    OrderOrigin, OrderProjection, OriginError, OriginServices, ProjectionCache, ProjectionError,
    ProjectionStore,
};

pub fn location(name: &str) -> OrderLocation {
    OrderLocation {
        contact_name: name.to_string(),
        contact_phone_number: "010-0000-0000".to_string(),
        latitude: 37.5,
        longitude: 127.0,
        jibun_address: format!("{name} jibun"),
        road_address: format!("{name} road"),
        detail_address: None,
    }
}

pub fn order_created(order_id: i64) -> EventEnvelope {
    EventEnvelope::new(EventPayload::OrderCreated(OrderCreated {
        order_id: OrderId::new(order_id),
        order_number: format!("ORD-{order_id}"),
        order_status: "CREATED".to_string(),
        origin_location: location("store"),
        destination_location: location("home"),
        items: vec![OrderItem {
            item_name: "Coffee".to_string(),
            quantity: 2,
            price: Money::new(4500),
        }],
        ordered_at: Utc::now(),
    }))
}

pub fn dispatch_requested(order_id: i64, dispatch_id: i64) -> EventEnvelope {
    EventEnvelope::new(EventPayload::DispatchRequested(DispatchRequested {
        dispatch_id: DispatchId::new(dispatch_id),
        order_id: OrderId::new(order_id),
        requested_at: Utc::now(),
    }))
}

pub fn dispatch_dispatched(order_id: i64, agent_id: i64, fee: i64) -> EventEnvelope {
    EventEnvelope::new(EventPayload::DispatchDispatched(DispatchDispatched {
        dispatch_id: DispatchId::new(order_id * 10),
        order_id: OrderId::new(order_id),
        agent_id: AgentId::new(agent_id),
        delivery_fee: Money::new(fee),
        dispatched_at: Utc::now(),
    }))
}

pub fn delivery_started(order_id: i64, agent_id: i64, fee: i64) -> EventEnvelope {
    EventEnvelope::new(EventPayload::DeliveryStarted(DeliveryStarted {
        delivery_id: DeliveryId::new(order_id * 100),
        delivery_number: format!("DLV-{order_id}"),
        order_id: OrderId::new(order_id),
        agent_id: AgentId::new(agent_id),
        delivery_fee: Money::new(fee),
        delivery_status: "STARTED".to_string(),
        started_at: Utc::now(),
    }))
}

pub fn projection(order_id: i64) -> OrderProjection {
    let EventPayload::OrderCreated(created) = order_created(order_id).payload else {
        unreachable!("order_created builds an OrderCreated payload");
    };
    OrderProjection::from_order_created(&created, Utc::now())
}

pub fn order_origin(order_id: i64) -> OrderOrigin {
    OrderOrigin {
        order_id: OrderId::new(order_id),
        order_number: format!("ORD-{order_id}"),
        order_status: Some("CREATED".to_string()),
        origin_location: Some(location("store")),
        destination_location: Some(location("home")),
        items: vec![],
        ordered_at: Some(Utc::now()),
        cancelled_at: None,
    }
}

pub fn dispatch_origin(order_id: i64) -> DispatchOrigin {
    DispatchOrigin {
        dispatch_id: DispatchId::new(order_id * 10),
        order_id: OrderId::new(order_id),
        agent_id: Some(AgentId::new(7)),
        delivery_fee: Some(Money::new(3000)),
        requested_at: Some(Utc::now()),
        dispatched_at: Some(Utc::now()),
        status: Some("DISPATCHED".to_string()),
    }
}

/// Cache that counts reads and can be switched to fail every call.
#[derive(Clone, Default)]
pub struct CountingCache {
    inner: MokaProjectionCache,
    pub gets: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingCache {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    fn check(&self) -> projections::Result<()> {
        if self.fail {
            return Err(ProjectionError::Serialization(serde_json::Error::io(
                std::io::Error::other("cache unavailable"),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectionCache for CountingCache {
    async fn get(&self, order_id: OrderId) -> projections::Result<Option<OrderProjection>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get(order_id).await
    }

    async fn put(&self, projection: &OrderProjection) -> projections::Result<()> {
        self.check()?;
        self.inner.put(projection).await
    }

    async fn remove(&self, order_id: OrderId) -> projections::Result<()> {
        self.check()?;
        self.inner.remove(order_id).await
    }
}

/// Document store that counts reads and writes.
#[derive(Clone, Default)]
pub struct CountingDocuments {
    pub inner: InMemoryDocumentStore,
    pub finds: Arc<AtomicUsize>,
    pub saves: Arc<AtomicUsize>,
}

impl CountingDocuments {
    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingDocuments {
    async fn find(&self, order_id: OrderId) -> projections::Result<Option<OrderProjection>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(order_id).await
    }

    async fn save(&self, projection: &OrderProjection) -> projections::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(projection).await
    }

    async fn delete(&self, order_id: OrderId) -> projections::Result<bool> {
        self.inner.delete(order_id).await
    }
}

/// Canned origin services with an optional delay on the dispatch lookup.
#[derive(Default)]
pub struct StubOrigins {
    pub order: Option<OrderOrigin>,
    pub dispatch: Option<DispatchOrigin>,
    pub delivery: Option<DeliveryOrigin>,
    pub dispatch_delay: Option<Duration>,
    pub delivery_fails: bool,
    pub calls: AtomicUsize,
}

impl StubOrigins {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OriginServices for StubOrigins {
    async fn get_order(&self, _order_id: OrderId) -> Result<Option<OrderOrigin>, OriginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.order.clone())
    }

    async fn get_dispatch_by_order_id(
        &self,
        _order_id: OrderId,
    ) -> Result<Option<DispatchOrigin>, OriginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.dispatch_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.dispatch.clone())
    }

    async fn get_delivery_by_order_id(
        &self,
        _order_id: OrderId,
    ) -> Result<Option<DeliveryOrigin>, OriginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delivery_fails {
            return Err(OriginError::Status {
                service: "delivery",
                status: 503,
            });
        }
        Ok(self.delivery.clone())
    }
}

pub fn store(cache: &CountingCache, documents: &CountingDocuments) -> ProjectionStore {
    ProjectionStore::new(Arc::new(cache.clone()), Arc::new(documents.clone()))
}
