//! Projection error types.

use common::OrderId;
use events::EventType;
use thiserror::Error;

/// Errors that can occur while folding events or touching a storage tier.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failed to (de)serialize a stored projection.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound message is not a valid envelope.
    #[error("Envelope error: {0}")]
    Envelope(#[from] events::EnvelopeError),

    /// The broker rejected a subscription or acknowledgement.
    #[error("Broker error: {0}")]
    Broker(#[from] event_bus::BusError),

    /// No handler is registered for the event type.
    #[error("No projection handler registered for {0}")]
    NoHandler(EventType),

    /// More than one handler claims the event type.
    #[error("Multiple projection handlers registered for {0}")]
    DuplicateHandler(EventType),

    /// A handler received a payload of another event type.
    #[error("Handler for {expected} received a {actual} payload")]
    UnexpectedPayload {
        expected: EventType,
        actual: EventType,
    },

    /// An update handler ran without the projection it updates.
    #[error("Projection for order {0} does not exist")]
    MissingProjection(OrderId),

    /// The event refers to a different order than the projection it updates.
    #[error("Order id mismatch: projection {projection}, event {event}")]
    OrderIdMismatch { projection: OrderId, event: OrderId },
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Errors returned by an origin service client.
#[derive(Debug, Error)]
pub enum OriginError {
    /// The request could not be sent or the body could not be decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("{service} service returned status {status}")]
    Status { service: &'static str, status: u16 },
}

/// Errors surfaced by the read path.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Every tier missed and the fallback found nothing.
    #[error("Order {0} not found")]
    NotFound(OrderId),
}
