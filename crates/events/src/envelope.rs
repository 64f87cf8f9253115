//! Wire envelope shared by producers and consumers.
//!
//! ```json
//! {
//!   "event_id": "…uuid…",
//!   "type": "dispatch.dispatch.dispatched",
//!   "source": "dispatch",
//!   "timestamp": 1735725600000,
//!   "schema_version": "1.0",
//!   "payload": { … }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::{EnvelopeError, EventId, EventPayload, EventSource, EventType, Result, SchemaVersion};

/// A domain event with its delivery metadata.
///
/// The event type is derived from the payload variant, so an envelope can never
/// carry a payload of the wrong shape. Decoding rejects any input where the
/// declared `type` and the payload disagree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireEnvelope")]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub source: EventSource,
    pub timestamp: DateTime<Utc>,
    pub schema_version: SchemaVersion,
    pub payload: EventPayload,
}

impl EventEnvelope {
    /// Wraps a payload with a fresh event id, the current time and the current schema version.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            source: payload.event_type().source(),
            timestamp: Utc::now(),
            schema_version: SchemaVersion::CURRENT,
            payload,
        }
    }

    /// Overrides the envelope timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Serializes the envelope to its JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an envelope from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Decodes an envelope from raw message bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let wire: WireEnvelope = serde_json::from_slice(bytes)?;
        Self::try_from(wire)
    }

    /// Reads only the `type` field of a serialized envelope.
    ///
    /// Used to route an already-serialized envelope without decoding its payload.
    pub fn peek_type(json: &str) -> Result<EventType> {
        #[derive(Deserialize)]
        struct TypeOnly {
            #[serde(rename = "type")]
            event_type: String,
        }

        let TypeOnly { event_type } = serde_json::from_str(json)?;
        event_type.parse()
    }
}

#[derive(Deserialize)]
struct WireEnvelope {
    event_id: EventId,
    #[serde(rename = "type")]
    event_type: EventType,
    source: EventSource,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    schema_version: SchemaVersion,
    payload: serde_json::Value,
}

#[derive(Serialize)]
struct WireEnvelopeRef<'a> {
    event_id: EventId,
    #[serde(rename = "type")]
    event_type: EventType,
    source: EventSource,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    schema_version: SchemaVersion,
    payload: &'a EventPayload,
}

impl TryFrom<WireEnvelope> for EventEnvelope {
    type Error = EnvelopeError;

    fn try_from(wire: WireEnvelope) -> Result<Self> {
        let event_type = wire.event_type;
        if event_type.source() != wire.source {
            return Err(EnvelopeError::SourceMismatch {
                event_type,
                declared: wire.source,
            });
        }

        let payload = EventPayload::decode(event_type, wire.payload)
            .map_err(|reason| EnvelopeError::PayloadMismatch { event_type, reason })?;

        Ok(Self {
            event_id: wire.event_id,
            source: wire.source,
            timestamp: wire.timestamp,
            schema_version: wire.schema_version,
            payload,
        })
    }
}

impl Serialize for EventEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireEnvelopeRef {
            event_id: self.event_id,
            event_type: self.event_type(),
            source: self.source,
            timestamp: self.timestamp,
            schema_version: self.schema_version,
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DispatchDispatched, OrderCancelled};
    use common::{AgentId, DispatchId, Money, OrderId};

    fn dispatched() -> EventEnvelope {
        EventEnvelope::new(EventPayload::DispatchDispatched(DispatchDispatched {
            dispatch_id: DispatchId::new(10),
            order_id: OrderId::new(42),
            agent_id: AgentId::new(7),
            delivery_fee: Money::new(3000),
            dispatched_at: "2025-01-01T10:00:00Z".parse().unwrap(),
        }))
        .with_timestamp(DateTime::from_timestamp_millis(1_735_725_600_000).unwrap())
    }

    #[test]
    fn wire_form_is_snake_case_with_millis() {
        let json: serde_json::Value = serde_json::from_str(&dispatched().to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "dispatch.dispatch.dispatched");
        assert_eq!(json["source"], "dispatch");
        assert_eq!(json["timestamp"], 1_735_725_600_000_i64);
        assert_eq!(json["schema_version"], "1.0");
        assert_eq!(json["payload"]["agent_id"], 7);
        assert_eq!(json["payload"]["delivery_fee"], 3000);
        assert!(json["event_id"].is_string());
    }

    #[test]
    fn decodes_what_it_encodes() {
        let original = dispatched();
        let decoded = EventEnvelope::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn rejects_payload_of_wrong_shape() {
        let mut json: serde_json::Value =
            serde_json::from_str(&dispatched().to_json().unwrap()).unwrap();
        json["type"] = "order.order.created".into();
        json["source"] = "order".into();

        let err = EventEnvelope::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::PayloadMismatch {
                event_type: EventType::OrderCreated,
                ..
            }
        ));
    }

    #[test]
    fn rejects_source_that_does_not_emit_the_type() {
        let mut json: serde_json::Value =
            serde_json::from_str(&dispatched().to_json().unwrap()).unwrap();
        json["source"] = "delivery".into();

        let err = EventEnvelope::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, EnvelopeError::SourceMismatch { .. }));
    }

    #[test]
    fn rejects_unknown_type_and_garbage() {
        let mut json: serde_json::Value =
            serde_json::from_str(&dispatched().to_json().unwrap()).unwrap();
        json["type"] = "dispatch.dispatch.exploded".into();
        assert!(EventEnvelope::from_json(&json.to_string()).is_err());

        assert!(matches!(
            EventEnvelope::from_slice(b"not json"),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn peek_type_reads_discriminant_only() {
        let envelope = EventEnvelope::new(EventPayload::OrderCancelled(OrderCancelled {
            order_id: OrderId::new(3),
            cancelled_at: Utc::now(),
        }));
        let json = envelope.to_json().unwrap();

        assert_eq!(EventEnvelope::peek_type(&json).unwrap(), EventType::OrderCancelled);
        assert!(EventEnvelope::peek_type(r#"{"type":"nope"}"#).is_err());
    }
}
