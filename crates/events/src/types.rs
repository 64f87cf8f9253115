//! Event identity, classification and versioning.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EnvelopeError;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The service that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Order,
    Dispatch,
    Delivery,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Order => "order",
            EventSource::Dispatch => "dispatch",
            EventSource::Delivery => "delivery",
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broker topic an event is published to. One topic per source service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    #[serde(rename = "order.event")]
    Order,
    #[serde(rename = "dispatch.event")]
    Dispatch,
    #[serde(rename = "delivery.event")]
    Delivery,
}

impl EventTopic {
    /// Every topic the read side subscribes to.
    pub const ALL: [EventTopic; 3] = [EventTopic::Order, EventTopic::Dispatch, EventTopic::Delivery];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTopic::Order => "order.event",
            EventTopic::Dispatch => "dispatch.event",
            EventTopic::Delivery => "delivery.event",
        }
    }
}

impl std::fmt::Display for EventTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventTopic {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventTopic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| EnvelopeError::UnknownTopic(s.to_string()))
    }
}

/// Discriminant of a domain event.
///
/// The type alone determines the payload shape, the topic and the emitting source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "order.order.created")]
    OrderCreated,
    #[serde(rename = "order.order.destination-changed")]
    OrderDestinationChanged,
    #[serde(rename = "order.order.cancelled")]
    OrderCancelled,
    #[serde(rename = "dispatch.dispatch.requested")]
    DispatchRequested,
    #[serde(rename = "dispatch.dispatch.dispatched")]
    DispatchDispatched,
    #[serde(rename = "delivery.delivery.started")]
    DeliveryStarted,
    #[serde(rename = "delivery.delivery.picked-up")]
    DeliveryPickedUp,
    #[serde(rename = "delivery.delivery.delivered")]
    DeliveryDelivered,
    #[serde(rename = "delivery.delivery.cancelled")]
    DeliveryCancelled,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::OrderCreated,
        EventType::OrderDestinationChanged,
        EventType::OrderCancelled,
        EventType::DispatchRequested,
        EventType::DispatchDispatched,
        EventType::DeliveryStarted,
        EventType::DeliveryPickedUp,
        EventType::DeliveryDelivered,
        EventType::DeliveryCancelled,
    ];

    /// Returns the wire discriminant, e.g. `"dispatch.dispatch.dispatched"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderCreated => "order.order.created",
            EventType::OrderDestinationChanged => "order.order.destination-changed",
            EventType::OrderCancelled => "order.order.cancelled",
            EventType::DispatchRequested => "dispatch.dispatch.requested",
            EventType::DispatchDispatched => "dispatch.dispatch.dispatched",
            EventType::DeliveryStarted => "delivery.delivery.started",
            EventType::DeliveryPickedUp => "delivery.delivery.picked-up",
            EventType::DeliveryDelivered => "delivery.delivery.delivered",
            EventType::DeliveryCancelled => "delivery.delivery.cancelled",
        }
    }

    pub fn source(&self) -> EventSource {
        match self {
            EventType::OrderCreated
            | EventType::OrderDestinationChanged
            | EventType::OrderCancelled => EventSource::Order,
            EventType::DispatchRequested | EventType::DispatchDispatched => EventSource::Dispatch,
            EventType::DeliveryStarted
            | EventType::DeliveryPickedUp
            | EventType::DeliveryDelivered
            | EventType::DeliveryCancelled => EventSource::Delivery,
        }
    }

    pub fn topic(&self) -> EventTopic {
        match self.source() {
            EventSource::Order => EventTopic::Order,
            EventSource::Dispatch => EventTopic::Dispatch,
            EventSource::Delivery => EventTopic::Delivery,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EnvelopeError::UnknownEventType(s.to_string()))
    }
}

/// Payload schema version, written as `"<major>.<minor>"` on the wire.
///
/// Carried on every envelope; consumers do not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    major: u32,
    minor: u32,
}

impl SchemaVersion {
    /// Version every payload is currently produced with.
    pub const CURRENT: SchemaVersion = SchemaVersion { major: 1, minor: 0 };

    /// Creates a version. Major versions start at 1.
    pub fn new(major: u32, minor: u32) -> Result<Self, EnvelopeError> {
        if major < 1 {
            return Err(EnvelopeError::InvalidSchemaVersion(format!(
                "{major}.{minor}"
            )));
        }
        Ok(Self { major, minor })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SchemaVersion {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EnvelopeError::InvalidSchemaVersion(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let major: u32 = major.parse().map_err(|_| invalid())?;
        let minor: u32 = minor.parse().map_err(|_| invalid())?;
        Self::new(major, minor).map_err(|_| invalid())
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> Self {
        version.to_string()
    }
}
