//! In-memory implementation of the EventBus trait for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use events::EventTopic;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

use crate::{BusError, BusMessage, BusResult, EventBus};

#[derive(Debug, Default)]
struct BusState {
    logs: HashMap<EventTopic, Vec<BusMessage>>,
    /// Next offset to deliver per topic.
    committed: HashMap<EventTopic, u64>,
    fail_publish: bool,
    publish_delay: Option<Duration>,
}

/// EventBus that retains every published message per topic.
///
/// A subscription first replays the retained messages after the committed
/// offset, then follows live publishes. Publish failures and slow publishes can
/// be simulated for tests.
#[derive(Clone)]
pub struct InMemoryBus {
    state: Arc<Mutex<BusState>>,
    sender: broadcast::Sender<BusMessage>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            sender,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent publish fail.
    pub fn set_fail_publish(&self, fail: bool) {
        self.lock().fail_publish = fail;
    }

    /// Delays every subsequent publish by `delay`.
    pub fn set_publish_delay(&self, delay: Option<Duration>) {
        self.lock().publish_delay = delay;
    }

    /// Returns all messages published to a topic, in offset order.
    pub fn published(&self, topic: EventTopic) -> Vec<BusMessage> {
        self.lock().logs.get(&topic).cloned().unwrap_or_default()
    }

    /// Returns the next offset a new subscription on `topic` would start from.
    pub fn committed_offset(&self, topic: EventTopic) -> u64 {
        self.lock().committed.get(&topic).copied().unwrap_or(0)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, topic: EventTopic, key: &str, payload: Vec<u8>) -> BusResult<()> {
        let delay = self.lock().publish_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.fail_publish {
            return Err(BusError::Publish(format!("broker rejected message on {topic}")));
        }

        let log = state.logs.entry(topic).or_default();
        let message = BusMessage {
            topic,
            key: Some(key.to_string()),
            payload,
            offset: log.len() as u64,
        };
        log.push(message.clone());

        // No live subscribers is fine; the log retains the message.
        let _ = self.sender.send(message);
        Ok(())
    }

    async fn subscribe(&self, topic: EventTopic) -> BusResult<BoxStream<'static, BusMessage>> {
        // Snapshot and receiver are taken under the same lock so no publish falls between them.
        let (backlog, receiver) = {
            let state = self.lock();
            let from = state.committed.get(&topic).copied().unwrap_or(0) as usize;
            let backlog: Vec<BusMessage> = state
                .logs
                .get(&topic)
                .map(|log| log.iter().skip(from).cloned().collect())
                .unwrap_or_default();
            (backlog, self.sender.subscribe())
        };

        let live = stream::unfold(receiver, move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(message) if message.topic == topic => return Some((message, receiver)),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%topic, skipped, "in-memory subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream::iter(backlog).chain(live).boxed())
    }

    async fn commit(&self, message: &BusMessage) -> BusResult<()> {
        let mut state = self.lock();
        let next = state.committed.entry(message.topic).or_insert(0);
        *next = (*next).max(message.offset + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next(stream: &mut BoxStream<'static, BusMessage>) -> BusMessage {
        tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended")
    }

    #[tokio::test]
    async fn live_messages_are_filtered_by_topic() {
        let bus = InMemoryBus::new();
        let mut orders = bus.subscribe(EventTopic::Order).await.unwrap();

        bus.publish(EventTopic::Dispatch, "10", b"dispatch".to_vec())
            .await
            .unwrap();
        bus.publish(EventTopic::Order, "42", b"order".to_vec())
            .await
            .unwrap();

        let message = next(&mut orders).await;
        assert_eq!(message.topic, EventTopic::Order);
        assert_eq!(message.key.as_deref(), Some("42"));
        assert_eq!(message.payload, b"order");
        assert_eq!(message.offset, 0);
    }

    #[tokio::test]
    async fn subscription_replays_uncommitted_backlog() {
        let bus = InMemoryBus::new();
        for i in 0..3 {
            bus.publish(EventTopic::Delivery, "5", format!("m{i}").into_bytes())
                .await
                .unwrap();
        }

        let first = bus.published(EventTopic::Delivery).remove(0);
        bus.commit(&first).await.unwrap();
        assert_eq!(bus.committed_offset(EventTopic::Delivery), 1);

        let mut stream = bus.subscribe(EventTopic::Delivery).await.unwrap();
        assert_eq!(next(&mut stream).await.offset, 1);
        assert_eq!(next(&mut stream).await.offset, 2);

        bus.publish(EventTopic::Delivery, "5", b"m3".to_vec())
            .await
            .unwrap();
        assert_eq!(next(&mut stream).await.offset, 3);
    }

    #[tokio::test]
    async fn commit_never_moves_backwards() {
        let bus = InMemoryBus::new();
        for _ in 0..2 {
            bus.publish(EventTopic::Order, "1", b"x".to_vec()).await.unwrap();
        }
        let published = bus.published(EventTopic::Order);

        bus.commit(&published[1]).await.unwrap();
        bus.commit(&published[0]).await.unwrap();
        assert_eq!(bus.committed_offset(EventTopic::Order), 2);
    }

    #[tokio::test]
    async fn simulated_publish_failure() {
        let bus = InMemoryBus::new();
        bus.set_fail_publish(true);

        let result = bus.publish(EventTopic::Order, "1", b"x".to_vec()).await;
        assert!(matches!(result, Err(BusError::Publish(_))));
        assert!(bus.published(EventTopic::Order).is_empty());

        bus.set_fail_publish(false);
        bus.publish(EventTopic::Order, "1", b"x".to_vec()).await.unwrap();
        assert_eq!(bus.published(EventTopic::Order).len(), 1);
    }
}
