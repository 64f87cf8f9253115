//! The order projection: one read-optimized document per order.
//!
//! Every update is a "copy with changed fields" constructor on
//! [`OrderProjection`]. Fields are additive or overwriting; nothing that has
//! been set is cleared again.

use chrono::{DateTime, Utc};
use common::{AgentId, DeliveryId, DispatchId, Money, OrderId};
use events::{
    DeliveryCancelled, DeliveryDelivered, DeliveryPickedUp, DeliveryStarted, DispatchDispatched,
    DispatchRequested, OrderCreated, OrderItem, OrderLocation,
};
use serde::{Deserialize, Serialize};

/// Order state as seen by the read side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_number: String,
    pub order_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_location: Option<OrderLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_location: Option<OrderLocation>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub ordered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Dispatch state. `suggested_fee` is the fee offered when the agent was assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fee: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Delivery state. `delivery_fee` is the actual fee and may differ from the suggested one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picked_up_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

/// Read aggregate keyed by order id.
///
/// `order_info` always exists; dispatch and delivery sections stay `None`
/// until their first event is observed. `revision` counts applied events and
/// is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProjection {
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_id: Option<DispatchId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<DeliveryId>,
    pub order_info: OrderInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_info: Option<DispatchInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_info: Option<DeliveryInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl OrderProjection {
    /// Creates a projection with only order information.
    pub fn new(order_id: OrderId, order_info: OrderInfo, now: DateTime<Utc>) -> Self {
        Self {
            order_id,
            dispatch_id: None,
            delivery_id: None,
            order_info,
            dispatch_info: None,
            delivery_info: None,
            created_at: now,
            updated_at: now,
            revision: 1,
        }
    }

    /// Manufactures the projection for a newly created order.
    pub fn from_order_created(event: &OrderCreated, now: DateTime<Utc>) -> Self {
        Self::new(
            event.order_id,
            OrderInfo {
                order_number: event.order_number.clone(),
                order_status: event.order_status.clone(),
                origin_location: Some(event.origin_location.clone()),
                destination_location: Some(event.destination_location.clone()),
                items: event.items.clone(),
                ordered_at: event.ordered_at,
                cancelled_at: None,
            },
            now,
        )
    }

    pub fn with_destination(&self, destination: &OrderLocation, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.order_info.destination_location = Some(destination.clone());
        next
    }

    pub fn with_order_cancelled(&self, cancelled_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.order_info.order_status = "CANCELLED".to_string();
        next.order_info.cancelled_at = Some(cancelled_at);
        next
    }

    /// Records the dispatch request, keeping any dispatch fields already known.
    pub fn with_dispatch_requested(&self, event: &DispatchRequested, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.dispatch_id = Some(event.dispatch_id);
        let dispatch = next.dispatch_info.get_or_insert_with(DispatchInfo::default);
        dispatch.requested_at = Some(event.requested_at);
        next
    }

    pub fn with_dispatch_dispatched(&self, event: &DispatchDispatched, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.dispatch_id = Some(event.dispatch_id);
        let dispatch = next.dispatch_info.get_or_insert_with(DispatchInfo::default);
        dispatch.agent_id = Some(event.agent_id);
        dispatch.suggested_fee = Some(event.delivery_fee);
        dispatch.dispatched_at = Some(event.dispatched_at);
        next
    }

    pub fn with_delivery_started(&self, event: &DeliveryStarted, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.delivery_id = Some(event.delivery_id);
        let delivery = next.delivery_info.get_or_insert_with(DeliveryInfo::default);
        delivery.delivery_number = Some(event.delivery_number.clone());
        delivery.agent_id = Some(event.agent_id);
        delivery.delivery_fee = Some(event.delivery_fee);
        delivery.delivery_status = Some(event.delivery_status.clone());
        delivery.started_at = Some(event.started_at);
        next
    }

    pub fn with_delivery_picked_up(&self, event: &DeliveryPickedUp, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.delivery_id = Some(event.delivery_id);
        let delivery = next.delivery_info.get_or_insert_with(DeliveryInfo::default);
        if event.agent_id.is_some() {
            delivery.agent_id = event.agent_id;
        }
        delivery.delivery_status = Some(event.delivery_status.clone());
        delivery.picked_up_at = Some(event.picked_up_at);
        next
    }

    pub fn with_delivery_delivered(&self, event: &DeliveryDelivered, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.delivery_id = Some(event.delivery_id);
        let delivery = next.delivery_info.get_or_insert_with(DeliveryInfo::default);
        if event.agent_id.is_some() {
            delivery.agent_id = event.agent_id;
        }
        delivery.delivery_status = Some(event.delivery_status.clone());
        delivery.delivered_at = Some(event.delivered_at);
        next
    }

    pub fn with_delivery_cancelled(&self, event: &DeliveryCancelled, now: DateTime<Utc>) -> Self {
        let mut next = self.touched(now);
        next.delivery_id = Some(event.delivery_id);
        let delivery = next.delivery_info.get_or_insert_with(DeliveryInfo::default);
        delivery.delivery_status = Some(event.delivery_status.clone());
        delivery.cancelled_at = Some(event.cancelled_at);
        if event.reason.is_some() {
            delivery.cancel_reason = event.reason.clone();
        }
        next
    }

    /// Most advanced stage this projection has reached.
    pub fn progress(&self) -> OrderProgress {
        OrderProgress::of(self)
    }

    fn touched(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.updated_at = now;
        next.revision += 1;
        next
    }
}

/// Stage of an order derived from the most advanced populated timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderProgress {
    OrderOrdered,
    DispatchRequested,
    DispatchDispatched,
    DeliveryStarted,
    DeliveryPickedUp,
    DeliveryDelivered,
    DeliveryCancelled,
    OrderCancelled,
}

impl OrderProgress {
    fn of(projection: &OrderProjection) -> Self {
        if projection.order_info.cancelled_at.is_some() {
            return OrderProgress::OrderCancelled;
        }

        if let Some(delivery) = &projection.delivery_info {
            if delivery.cancelled_at.is_some() {
                return OrderProgress::DeliveryCancelled;
            }
            if delivery.delivered_at.is_some() {
                return OrderProgress::DeliveryDelivered;
            }
            if delivery.picked_up_at.is_some() {
                return OrderProgress::DeliveryPickedUp;
            }
            if delivery.started_at.is_some() {
                return OrderProgress::DeliveryStarted;
            }
        }

        if let Some(dispatch) = &projection.dispatch_info {
            if dispatch.dispatched_at.is_some() {
                return OrderProgress::DispatchDispatched;
            }
            if dispatch.requested_at.is_some() {
                return OrderProgress::DispatchRequested;
            }
        }

        OrderProgress::OrderOrdered
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderProgress::OrderOrdered => "ORDER_ORDERED",
            OrderProgress::DispatchRequested => "DISPATCH_REQUESTED",
            OrderProgress::DispatchDispatched => "DISPATCH_DISPATCHED",
            OrderProgress::DeliveryStarted => "DELIVERY_STARTED",
            OrderProgress::DeliveryPickedUp => "DELIVERY_PICKED_UP",
            OrderProgress::DeliveryDelivered => "DELIVERY_DELIVERED",
            OrderProgress::DeliveryCancelled => "DELIVERY_CANCELLED",
            OrderProgress::OrderCancelled => "ORDER_CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
