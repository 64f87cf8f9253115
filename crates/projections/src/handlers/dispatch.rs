//! Dispatch event handlers.

use chrono::{DateTime, Utc};
use events::{EventEnvelope, EventPayload, EventType};

use super::{target, unexpected};
use crate::Result;
use crate::handler::ProjectionHandler;
use crate::model::OrderProjection;

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchRequestedHandler;

impl ProjectionHandler for DispatchRequestedHandler {
    fn event_type(&self) -> EventType {
        EventType::DispatchRequested
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::DispatchRequested(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        Ok(projection.with_dispatch_requested(event, now))
    }
}

/// Records the assigned agent and the suggested fee.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchDispatchedHandler;

impl ProjectionHandler for DispatchDispatchedHandler {
    fn event_type(&self) -> EventType {
        EventType::DispatchDispatched
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection> {
        let EventPayload::DispatchDispatched(event) = &envelope.payload else {
            return Err(unexpected(self.event_type(), envelope));
        };
        let projection = target(existing, event.order_id)?;
        tracing::debug!(
            order_id = %event.order_id,
            dispatch_id = %event.dispatch_id,
            agent_id = %event.agent_id,
            "updating dispatch info"
        );
        Ok(projection.with_dispatch_dispatched(event, now))
    }
}
