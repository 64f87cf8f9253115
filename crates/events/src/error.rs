use thiserror::Error;

use crate::{EventSource, EventType};

/// Errors raised while encoding or decoding event envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope is not valid JSON or misses a required field.
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload does not have the shape its declared type requires.
    #[error("Payload does not match event type {event_type}: {reason}")]
    PayloadMismatch {
        event_type: EventType,
        #[source]
        reason: serde_json::Error,
    },

    /// The envelope claims a source that never emits its event type.
    #[error("Event type {event_type} cannot originate from {declared}")]
    SourceMismatch {
        event_type: EventType,
        declared: EventSource,
    },

    /// Unrecognized event type discriminant.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// Unrecognized topic name.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Schema version is not of the form `<major>.<minor>`.
    #[error("Invalid schema version: {0}")]
    InvalidSchemaVersion(String),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
