//! Event payloads, one struct per event type.

use chrono::{DateTime, Utc};
use common::{AgentId, DeliveryId, DispatchId, Money, OrderId};
use serde::{Deserialize, Serialize};

use crate::EventType;

/// Pickup or drop-off point of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLocation {
    pub contact_name: String,
    pub contact_phone_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub jibun_address: String,
    pub road_address: String,
    #[serde(default)]
    pub detail_address: Option<String>,
}

/// A line item of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_name: String,
    pub quantity: u32,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub order_number: String,
    pub order_status: String,
    pub origin_location: OrderLocation,
    pub destination_location: OrderLocation,
    pub items: Vec<OrderItem>,
    pub ordered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDestinationChanged {
    pub order_id: OrderId,
    pub destination_location: OrderLocation,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequested {
    pub dispatch_id: DispatchId,
    pub order_id: OrderId,
    pub requested_at: DateTime<Utc>,
}

/// An agent accepted the dispatch. `delivery_fee` is the fee suggested at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchDispatched {
    pub dispatch_id: DispatchId,
    pub order_id: OrderId,
    pub agent_id: AgentId,
    pub delivery_fee: Money,
    pub dispatched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStarted {
    pub delivery_id: DeliveryId,
    pub delivery_number: String,
    pub order_id: OrderId,
    pub agent_id: AgentId,
    pub delivery_fee: Money,
    pub delivery_status: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPickedUp {
    pub delivery_id: DeliveryId,
    pub order_id: OrderId,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub delivery_status: String,
    pub picked_up_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDelivered {
    pub delivery_id: DeliveryId,
    pub order_id: OrderId,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub delivery_status: String,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryCancelled {
    pub delivery_id: DeliveryId,
    pub order_id: OrderId,
    pub delivery_status: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
}

/// Closed set of event payloads.
///
/// Serializes as the bare inner payload; the discriminant travels in the
/// envelope's `type` field and decoding goes through [`EventPayload::decode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    OrderCreated(OrderCreated),
    OrderDestinationChanged(OrderDestinationChanged),
    OrderCancelled(OrderCancelled),
    DispatchRequested(DispatchRequested),
    DispatchDispatched(DispatchDispatched),
    DeliveryStarted(DeliveryStarted),
    DeliveryPickedUp(DeliveryPickedUp),
    DeliveryDelivered(DeliveryDelivered),
    DeliveryCancelled(DeliveryCancelled),
}

impl EventPayload {
    /// Decodes a raw payload into the shape its event type requires.
    pub fn decode(
        event_type: EventType,
        raw: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match event_type {
            EventType::OrderCreated => Self::OrderCreated(serde_json::from_value(raw)?),
            EventType::OrderDestinationChanged => {
                Self::OrderDestinationChanged(serde_json::from_value(raw)?)
            }
            EventType::OrderCancelled => Self::OrderCancelled(serde_json::from_value(raw)?),
            EventType::DispatchRequested => Self::DispatchRequested(serde_json::from_value(raw)?),
            EventType::DispatchDispatched => {
                Self::DispatchDispatched(serde_json::from_value(raw)?)
            }
            EventType::DeliveryStarted => Self::DeliveryStarted(serde_json::from_value(raw)?),
            EventType::DeliveryPickedUp => Self::DeliveryPickedUp(serde_json::from_value(raw)?),
            EventType::DeliveryDelivered => Self::DeliveryDelivered(serde_json::from_value(raw)?),
            EventType::DeliveryCancelled => Self::DeliveryCancelled(serde_json::from_value(raw)?),
        })
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::OrderCreated(_) => EventType::OrderCreated,
            Self::OrderDestinationChanged(_) => EventType::OrderDestinationChanged,
            Self::OrderCancelled(_) => EventType::OrderCancelled,
            Self::DispatchRequested(_) => EventType::DispatchRequested,
            Self::DispatchDispatched(_) => EventType::DispatchDispatched,
            Self::DeliveryStarted(_) => EventType::DeliveryStarted,
            Self::DeliveryPickedUp(_) => EventType::DeliveryPickedUp,
            Self::DeliveryDelivered(_) => EventType::DeliveryDelivered,
            Self::DeliveryCancelled(_) => EventType::DeliveryCancelled,
        }
    }

    /// The order every payload refers to; the projection key.
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::OrderCreated(p) => p.order_id,
            Self::OrderDestinationChanged(p) => p.order_id,
            Self::OrderCancelled(p) => p.order_id,
            Self::DispatchRequested(p) => p.order_id,
            Self::DispatchDispatched(p) => p.order_id,
            Self::DeliveryStarted(p) => p.order_id,
            Self::DeliveryPickedUp(p) => p.order_id,
            Self::DeliveryDelivered(p) => p.order_id,
            Self::DeliveryCancelled(p) => p.order_id,
        }
    }
}
