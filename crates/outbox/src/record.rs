//! Outbox record model.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::OutboxError;

/// Unique token of an outbox record, used to correlate publish logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventToken(Uuid);

impl EventToken {
    /// Creates a new random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an outbox record.
///
/// The only transition is `Registered -> Published`, performed once by the
/// publisher. Failed publishes stay `Registered` and are picked up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    Registered,
    Published,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Registered => "REGISTERED",
            OutboxStatus::Published => "PUBLISHED",
        }
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = OutboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTERED" => Ok(OutboxStatus::Registered),
            "PUBLISHED" => Ok(OutboxStatus::Published),
            other => Err(OutboxError::UnknownStatus(other.to_string())),
        }
    }
}

/// A record about to be inserted by the appender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutboxRecord {
    pub event_token: EventToken,
    /// Aggregate id of the entity the event is about; used as the broker key.
    pub entity_key: String,
    /// Serialized event envelope, forwarded to the broker verbatim.
    pub payload: String,
    pub registered_at: DateTime<Utc>,
}

impl NewOutboxRecord {
    pub fn register(entity_key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event_token: EventToken::new(),
            entity_key: entity_key.into(),
            payload: payload.into(),
            registered_at: Utc::now(),
        }
    }
}

/// A persisted outbox record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRecord {
    pub id: i64,
    pub event_token: EventToken,
    pub entity_key: String,
    pub status: OutboxStatus,
    pub payload: String,
    pub registered_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    /// Materializes a freshly inserted record.
    pub fn registered(id: i64, new: NewOutboxRecord) -> Self {
        Self {
            id,
            event_token: new.event_token,
            entity_key: new.entity_key,
            status: OutboxStatus::Registered,
            payload: new.payload,
            registered_at: new.registered_at,
            published_at: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == OutboxStatus::Published
    }
}

/// Order in which the publisher selects registered records.
///
/// Newest-first keeps fresh events flowing under backlog but can starve old
/// records and reorders events of the same entity; oldest-first preserves
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl FromStr for PollOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest-first" => Ok(PollOrder::NewestFirst),
            "oldest-first" => Ok(PollOrder::OldestFirst),
            other => Err(format!("unknown poll order: {other}")),
        }
    }
}
