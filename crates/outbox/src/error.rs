use std::time::Duration;

use thiserror::Error;

use crate::EventToken;

/// Errors that can occur when registering or relaying outbox records.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The event could not be rendered, or a stored payload could not be routed.
    #[error("Envelope error: {0}")]
    Envelope(#[from] events::EnvelopeError),

    /// The broker refused the message.
    #[error("Broker error: {0}")]
    Broker(#[from] event_bus::BusError),

    /// The broker did not acknowledge within the publish bound.
    #[error("Publishing {token} timed out after {timeout:?}")]
    PublishTimeout { token: EventToken, timeout: Duration },

    /// The aggregate is not in a state that produces the requested event.
    #[error("Cannot render {kind} event: {reason}")]
    Generation { kind: String, reason: String },

    /// A stored row holds a status this version does not know.
    #[error("Unknown outbox status: {0}")]
    UnknownStatus(String),
}

/// Result type for outbox operations.
pub type Result<T> = std::result::Result<T, OutboxError>;
