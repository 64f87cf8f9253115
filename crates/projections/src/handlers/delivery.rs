//! Delivery event handlers.

use chrono::{DateTime, Utc};
use events::{EventEnvelope, EventPayload, EventType};

use super::{target, unexpected};
use crate::Result;
use crate::handler::ProjectionHandler;
use crate::model::OrderProjection;

/// Records delivery number, agent and the actual fee.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryStartedHandler;

impl ProjectionHandler for DeliveryStartedHandler {
    fn event_type(&self) -> EventType {
        EventType::DeliveryStarted
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::DeliveryStarted(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        Ok(projection.with_delivery_started(event, now))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryPickedUpHandler;

impl ProjectionHandler for DeliveryPickedUpHandler {
    fn event_type(&self) -> EventType {
        EventType::DeliveryPickedUp
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::DeliveryPickedUp(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        Ok(projection.with_delivery_picked_up(event, now))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryDeliveredHandler;

impl ProjectionHandler for DeliveryDeliveredHandler {
    fn event_type(&self) -> EventType {
        EventType::DeliveryDelivered
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::DeliveryDelivered(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        Ok(projection.with_delivery_delivered(event, now))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryCancelledHandler;

impl ProjectionHandler for DeliveryCancelledHandler {
    fn event_type(&self) -> EventType {
        EventType::DeliveryCancelled
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::DeliveryCancelled(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        Ok(projection.with_delivery_cancelled(event, now))
    }
}
