//! Order event handlers.

use chrono::{DateTime, Utc};
use events::{EventEnvelope, EventPayload, EventType};

use super::{target, unexpected};
use crate::Result;
use crate::handler::ProjectionHandler;
use crate::model::OrderProjection;

/// Manufactures the projection from `order.order.created`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderCreatedHandler;

impl ProjectionHandler for OrderCreatedHandler {
    fn event_type(&self) -> EventType {
        EventType::OrderCreated
    }

    fn creates_projection(&self) -> bool {
        true
    }

    fn handle(
        &self,
        _existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::OrderCreated(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        tracing::debug!(order_id = %event.order_id, "creating order projection");
        Ok(OrderProjection::from_order_created(event, now))
    }
}

/// Overwrites the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderDestinationChangedHandler;

impl ProjectionHandler for OrderDestinationChangedHandler {
    fn event_type(&self) -> EventType {
        EventType::OrderDestinationChanged
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::OrderDestinationChanged(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        Ok(projection.with_destination(&event.destination_location, now))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderCancelledHandler;

impl ProjectionHandler for OrderCancelledHandler {
    fn event_type(&self) -> EventType {
        EventType::OrderCancelled
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::OrderCancelled(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        Ok(projection.with_order_cancelled(event.cancelled_at, now))
    }
}
