//! Per-topic consumer feeding the projection engine.

use event_bus::{BusMessage, EventBus};
use events::{EventEnvelope, EventTopic};
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::ProjectionEngine;
use crate::model::OrderProjection;
use crate::Result;

/// Consumes one topic and applies each message before taking the next.
///
/// Every message is acknowledged once handling finishes, including when it
/// fails: a failed event is logged and dropped instead of being redelivered.
pub struct EventConsumer<B> {
    bus: B,
    topic: EventTopic,
    engine: ProjectionEngine,
}

impl<B: EventBus + 'static> EventConsumer<B> {
    pub fn new(bus: B, topic: EventTopic, engine: ProjectionEngine) -> Self {
        Self { bus, topic, engine }
    }

    pub fn topic(&self) -> EventTopic {
        self.topic
    }

    /// Spawns the consumer loop on the runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(shutdown))
    }

    /// Consumes until `shutdown` flips to `true`, its sender is dropped or the
    /// subscription ends.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut messages = self.bus.subscribe(self.topic).await?;
        tracing::info!(topic = %self.topic, "event consumer started");

        loop {
            tokio::select! {
                next = messages.next() => {
                    let Some(message) = next else {
                        tracing::warn!(topic = %self.topic, "subscription closed");
                        break;
                    };
                    self.process(&message).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(topic = %self.topic, "event consumer stopped");
        Ok(())
    }

    /// Handles one message and acknowledges it regardless of the outcome.
    pub async fn process(&self, message: &BusMessage) {
        metrics::counter!("consumer_messages_received", "topic" => self.topic.as_str())
            .increment(1);

        if let Err(e) = self.handle(message).await {
            metrics::counter!("projection_events_dropped", "reason" => "handling_failed")
                .increment(1);
            tracing::error!(
                topic = %self.topic,
                offset = message.offset,
                key = message.key.as_deref().unwrap_or_default(),
                error = %e,
                "failed to handle event, dropping"
            );
        }

        if let Err(e) = self.bus.commit(message).await {
            tracing::error!(topic = %self.topic, offset = message.offset, error = %e, "failed to acknowledge message");
        }
    }

    /// Decodes and applies one message.
    pub async fn handle(&self, message: &BusMessage) -> Result<Option<OrderProjection>> {
        let envelope = EventEnvelope::from_slice(&message.payload)?;

        if envelope.event_type().topic() != self.topic {
            tracing::warn!(
                topic = %self.topic,
                event_type = %envelope.event_type(),
                "event published on an unexpected topic"
            );
        }

        self.engine.apply(&envelope).await
    }
}
