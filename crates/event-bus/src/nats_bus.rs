//! NATS JetStream implementation of the EventBus trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::{self, consumer, stream};
use async_nats::HeaderMap;
use async_trait::async_trait;
use events::EventTopic;
use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::Mutex;

use crate::{BusError, BusMessage, BusResult, EventBus};

/// Header carrying the producer's partitioning key.
pub const KEY_HEADER: &str = "Event-Key";

/// Durable consumer prefix used when none is configured.
pub const DEFAULT_DURABLE: &str = "read-model";

const STREAM_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 14);

type PendingAcks = Arc<Mutex<HashMap<(EventTopic, u64), jetstream::Message>>>;

/// EventBus implementation over NATS JetStream.
///
/// Each topic is backed by its own stream. Publishing waits for the stream's
/// acknowledgement, so a message is stored before the call returns. Each
/// subscription binds a durable pull consumer with explicit acks; instances
/// sharing a durable name split the messages between them, and anything not
/// acknowledged is redelivered.
///
/// Offsets are stream sequence numbers.
#[derive(Clone)]
pub struct NatsBus {
    jetstream: jetstream::Context,
    durable: String,
    pending: PendingAcks,
}

impl NatsBus {
    /// Connects to a NATS server and makes sure every topic has a stream.
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connection(e.to_string()))?;

        let bus = Self {
            jetstream: jetstream::new(client),
            durable: DEFAULT_DURABLE.to_string(),
            pending: PendingAcks::default(),
        };
        bus.ensure_streams().await?;
        Ok(bus)
    }

    /// Sets the durable consumer prefix shared by cooperating instances.
    pub fn with_durable(mut self, durable: impl Into<String>) -> Self {
        self.durable = durable.into();
        self
    }

    /// Creates the stream for each topic if it does not exist yet.
    pub async fn ensure_streams(&self) -> BusResult<()> {
        for topic in EventTopic::ALL {
            let name = stream_name(topic);
            if self.jetstream.get_stream(name).await.is_ok() {
                continue;
            }

            let config = stream::Config {
                name: name.to_string(),
                subjects: vec![topic.as_str().to_string()],
                max_age: STREAM_MAX_AGE,
                ..Default::default()
            };
            self.jetstream
                .create_stream(config)
                .await
                .map_err(|e| BusError::Connection(e.to_string()))?;
            tracing::info!(stream = name, subject = topic.as_str(), "stream created");
        }
        Ok(())
    }
}

/// JetStream stream backing a topic.
pub fn stream_name(topic: EventTopic) -> &'static str {
    match topic {
        EventTopic::Order => "ORDER_EVENTS",
        EventTopic::Dispatch => "DISPATCH_EVENTS",
        EventTopic::Delivery => "DELIVERY_EVENTS",
    }
}

fn consumer_name(durable: &str, topic: EventTopic) -> String {
    format!("{durable}-{}", stream_name(topic))
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, topic: EventTopic, key: &str, payload: Vec<u8>) -> BusResult<()> {
        let mut headers = HeaderMap::new();
        headers.insert(KEY_HEADER, key);

        let ack = self
            .jetstream
            .publish_with_headers(topic.as_str().to_string(), headers, payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;

        tracing::trace!(topic = %topic, sequence = ack.sequence, "message stored");
        Ok(())
    }

    async fn subscribe(&self, topic: EventTopic) -> BusResult<BoxStream<'static, BusMessage>> {
        let stream = self
            .jetstream
            .get_stream(stream_name(topic))
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;

        let name = consumer_name(&self.durable, topic);
        let consumer = stream
            .get_or_create_consumer(
                &name,
                consumer::pull::Config {
                    durable_name: Some(name.clone()),
                    ack_policy: consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;

        let pending = self.pending.clone();
        let stream = messages.filter_map(move |received| {
            let pending = pending.clone();
            async move {
                let message = match received {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!(topic = %topic, error = %e, "failed to receive message");
                        return None;
                    }
                };

                let offset = match message.info() {
                    Ok(info) => info.stream_sequence,
                    Err(e) => {
                        tracing::warn!(topic = %topic, error = %e, "message without stream metadata");
                        return None;
                    }
                };
                let key = message
                    .headers
                    .as_ref()
                    .and_then(|headers| headers.get(KEY_HEADER))
                    .map(|value| value.as_str().to_string());
                let payload = message.payload.to_vec();

                pending.lock().await.insert((topic, offset), message);

                Some(BusMessage {
                    topic,
                    key,
                    payload,
                    offset,
                })
            }
        });

        Ok(stream.boxed())
    }

    async fn commit(&self, message: &BusMessage) -> BusResult<()> {
        let delivered = self
            .pending
            .lock()
            .await
            .remove(&(message.topic, message.offset));

        let Some(delivered) = delivered else {
            tracing::trace!(topic = %message.topic, offset = message.offset, "nothing to acknowledge");
            return Ok(());
        };

        delivered
            .ack()
            .await
            .map_err(|e| BusError::Commit(e.to_string()))?;
        tracing::trace!(topic = %message.topic, offset = message.offset, "message acknowledged");
        Ok(())
    }
}
