//! Delivery source.

use chrono::{DateTime, Utc};
use common::{AgentId, DeliveryId, Money, OrderId};
use events::{DeliveryCancelled, DeliveryDelivered, DeliveryPickedUp, DeliveryStarted, EventPayload};
use outbox::PayloadGenerator;
use serde::{Deserialize, Serialize};

use crate::{DomainError, Result, missing_data};

/// The state of a delivery.
///
/// State transitions:
/// ```text
/// Started ──► PickedUp ──► Delivered
///    │
///    └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    #[default]
    Started,
    PickedUp,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn can_pick_up(&self) -> bool {
        matches!(self, DeliveryStatus::Started)
    }

    pub fn can_deliver(&self) -> bool {
        matches!(self, DeliveryStatus::PickedUp)
    }

    /// Only a delivery that has not picked anything up can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, DeliveryStatus::Started)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Started => "STARTED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Snapshot of a delivery after its latest mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    id: DeliveryId,
    delivery_number: String,
    order_id: OrderId,
    agent_id: AgentId,
    delivery_fee: Money,
    status: DeliveryStatus,
    started_at: DateTime<Utc>,
    picked_up_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
}

impl Delivery {
    /// Starts a delivery for a dispatched order.
    pub fn start(
        id: DeliveryId,
        delivery_number: impl Into<String>,
        order_id: OrderId,
        agent_id: AgentId,
        delivery_fee: Money,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            delivery_number: delivery_number.into(),
            order_id,
            agent_id,
            delivery_fee,
            status: DeliveryStatus::Started,
            started_at,
            picked_up_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancel_reason: None,
        }
    }

    pub fn pick_up(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_pick_up() {
            return Err(self.invalid_transition("pick up"));
        }
        self.status = DeliveryStatus::PickedUp;
        self.picked_up_at = Some(at);
        Ok(())
    }

    pub fn deliver(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_deliver() {
            return Err(self.invalid_transition("deliver"));
        }
        self.status = DeliveryStatus::Delivered;
        self.delivered_at = Some(at);
        Ok(())
    }

    pub fn cancel(&mut self, reason: Option<String>, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_cancel() {
            return Err(self.invalid_transition("cancel"));
        }
        self.status = DeliveryStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancel_reason = reason;
        Ok(())
    }

    fn invalid_transition(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            aggregate: "delivery",
            current_state: self.status.as_str(),
            action,
        }
    }
}

// Query methods
impl Delivery {
    pub fn id(&self) -> DeliveryId {
        self.id
    }

    pub fn delivery_number(&self) -> &str {
        &self.delivery_number
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn delivery_fee(&self) -> Money {
        self.delivery_fee
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn picked_up_at(&self) -> Option<DateTime<Utc>> {
        self.picked_up_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }
}

/// Events emitted by the delivery service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryEventKind {
    Started,
    PickedUp,
    Delivered,
    Cancelled,
}

/// Renders delivery events; the entity key is the delivery id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryPayloadGenerator;

impl PayloadGenerator for DeliveryPayloadGenerator {
    type Kind = DeliveryEventKind;
    type Source = Delivery;

    fn generate(&self, kind: DeliveryEventKind, delivery: &Delivery) -> outbox::Result<EventPayload> {
        let delivery_status = delivery.status.as_str().to_string();

        let payload = match kind {
            DeliveryEventKind::Started => EventPayload::DeliveryStarted(DeliveryStarted {
                delivery_id: delivery.id,
                delivery_number: delivery.delivery_number.clone(),
                order_id: delivery.order_id,
                agent_id: delivery.agent_id,
                delivery_fee: delivery.delivery_fee,
                delivery_status,
                started_at: delivery.started_at,
            }),
            DeliveryEventKind::PickedUp => EventPayload::DeliveryPickedUp(DeliveryPickedUp {
                delivery_id: delivery.id,
                order_id: delivery.order_id,
                agent_id: Some(delivery.agent_id),
                delivery_status,
                picked_up_at: delivery
                    .picked_up_at
                    .ok_or_else(|| missing_data(kind, "delivery not picked up"))?,
            }),
            DeliveryEventKind::Delivered => EventPayload::DeliveryDelivered(DeliveryDelivered {
                delivery_id: delivery.id,
                order_id: delivery.order_id,
                agent_id: Some(delivery.agent_id),
                delivery_status,
                delivered_at: delivery
                    .delivered_at
                    .ok_or_else(|| missing_data(kind, "delivery not delivered"))?,
            }),
            DeliveryEventKind::Cancelled => EventPayload::DeliveryCancelled(DeliveryCancelled {
                delivery_id: delivery.id,
                order_id: delivery.order_id,
                delivery_status,
                reason: delivery.cancel_reason.clone(),
                cancelled_at: delivery
                    .cancelled_at
                    .ok_or_else(|| missing_data(kind, "delivery not cancelled"))?,
            }),
        };
        Ok(payload)
    }

    fn entity_key(&self, delivery: &Delivery) -> String {
        delivery.id.to_string()
    }
}
