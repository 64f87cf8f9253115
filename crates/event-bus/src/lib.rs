//! Broker abstraction between the outbox publishers and the read-side consumers.
//!
//! - [`NatsBus`]: production implementation over NATS JetStream streams and durable consumers
//! - [`InMemoryBus`]: retained per-topic logs with committed offsets, for tests and local runs
//!
//! Messages are keyed (the outbox entity key) and carry an offset so consumers
//! can acknowledge what they have processed with [`EventBus::commit`].

mod inmemory_bus;
mod nats_bus;

pub use inmemory_bus::InMemoryBus;
pub use nats_bus::{DEFAULT_DURABLE, NatsBus};

use std::sync::Arc;

use async_trait::async_trait;
use events::EventTopic;
use futures_util::stream::BoxStream;

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: EventTopic,
    /// Partitioning key set by the producer.
    pub key: Option<String>,
    pub payload: Vec<u8>,
    /// Position of the message within its topic (the stream sequence on JetStream).
    pub offset: u64,
}

/// Errors that can occur when using the event bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    Publish(String),

    #[error("failed to subscribe to topic: {0}")]
    Subscribe(String),

    #[error("failed to commit offset: {0}")]
    Commit(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// Result type for event bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Publish/subscribe over the three domain topics.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes a message to a topic.
    ///
    /// Returns once the broker has accepted the message.
    async fn publish(&self, topic: EventTopic, key: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribes to a topic, starting after the last committed offset where the
    /// implementation tracks offsets.
    async fn subscribe(&self, topic: EventTopic) -> BusResult<BoxStream<'static, BusMessage>>;

    /// Acknowledges a processed message; unacknowledged messages may be delivered again.
    async fn commit(&self, message: &BusMessage) -> BusResult<()>;
}

#[async_trait]
impl<T: EventBus + ?Sized> EventBus for Arc<T> {
    async fn publish(&self, topic: EventTopic, key: &str, payload: Vec<u8>) -> BusResult<()> {
        (**self).publish(topic, key, payload).await
    }

    async fn subscribe(&self, topic: EventTopic) -> BusResult<BoxStream<'static, BusMessage>> {
        (**self).subscribe(topic).await
    }

    async fn commit(&self, message: &BusMessage) -> BusResult<()> {
        (**self).commit(message).await
    }
}
