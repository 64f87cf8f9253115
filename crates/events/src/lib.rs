//! Domain events exchanged between the logistics services.
//!
//! - [`EventEnvelope`] is the wire format: delivery metadata around a typed payload
//! - [`EventType`] is the discriminant; it fixes the payload shape, topic and source
//! - [`EventPayload`] is the closed set of payloads, one variant per event type

pub mod envelope;
pub mod error;
pub mod payload;
pub mod types;

pub use envelope::EventEnvelope;
pub use error::{EnvelopeError, Result};
pub use payload::{
    DeliveryCancelled, DeliveryDelivered, DeliveryPickedUp, DeliveryStarted, DispatchDispatched,
    DispatchRequested, EventPayload, OrderCancelled, OrderCreated, OrderDestinationChanged,
    OrderItem, OrderLocation,
};
pub use types::{EventId, EventSource, EventTopic, EventType, SchemaVersion};
