//! Built-in projection handlers, one per event type.

mod delivery;
mod dispatch;
mod order;

use std::sync::Arc;

use common::OrderId;

pub use delivery::{
    DeliveryCancelledHandler, DeliveryDeliveredHandler, DeliveryPickedUpHandler,
    DeliveryStartedHandler,
};
pub use dispatch::{DispatchDispatchedHandler, DispatchRequestedHandler};
pub use order::{OrderCancelledHandler, OrderCreatedHandler, OrderDestinationChangedHandler};

use crate::handler::ProjectionHandler;
use crate::model::OrderProjection;
use crate::{ProjectionError, Result};

/// One instance of every built-in handler.
pub fn all() -> Vec<Arc<dyn ProjectionHandler>> {
    vec![
        Arc::new(OrderCreatedHandler),
        Arc::new(OrderDestinationChangedHandler),
        Arc::new(OrderCancelledHandler),
        Arc::new(DispatchRequestedHandler),
        Arc::new(DispatchDispatchedHandler),
        Arc::new(DeliveryStartedHandler),
        Arc::new(DeliveryPickedUpHandler),
        Arc::new(DeliveryDeliveredHandler),
        Arc::new(DeliveryCancelledHandler),
    ]
}

/// Returns the projection an update handler works on.
///
/// Fails if there is none, or if it belongs to another order than the event.
fn target(existing: Option<&OrderProjection>, event_order: OrderId) -> Result<&OrderProjection> {
    let projection = existing.ok_or(ProjectionError::MissingProjection(event_order))?;
    if projection.order_id != event_order {
        tracing::warn!(
            projection_order_id = %projection.order_id,
            event_order_id = %event_order,
            "order id mismatch"
        );
        return Err(ProjectionError::OrderIdMismatch {
            projection: projection.order_id,
            event: event_order,
        });
    }
    Ok(projection)
}

/// Builds the error for a handler that received a foreign payload.
fn unexpected(expected: events::EventType, envelope: &events::EventEnvelope) -> ProjectionError {
    ProjectionError::UnexpectedPayload {
        expected,
        actual: envelope.event_type(),
    }
}
