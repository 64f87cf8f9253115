//! Registers domain events in the outbox from inside the mutating transaction.

use events::{EventEnvelope, EventPayload};

use crate::{EventToken, NewOutboxRecord, Result, store::OutboxWriter};

/// Renders the payload of a domain event from the aggregate that produced it.
///
/// One implementation per write-side domain; `Kind` enumerates the events that
/// domain emits and `Source` is the aggregate snapshot after the mutation.
pub trait PayloadGenerator: Send + Sync {
    type Kind: Copy + std::fmt::Debug + Send + Sync;
    type Source: Send + Sync;

    /// Builds the payload for `kind`.
    ///
    /// Fails with [`OutboxError::Generation`](crate::OutboxError::Generation)
    /// when `source` lacks the data the event carries.
    fn generate(&self, kind: Self::Kind, source: &Self::Source) -> Result<EventPayload>;

    /// Key of the entity the event is about (its aggregate id).
    fn entity_key(&self, source: &Self::Source) -> String;
}

/// Wraps generated payloads in an envelope and inserts them as `REGISTERED` records.
///
/// Performs no network I/O: the record is written through the caller's
/// [`OutboxWriter`], so it commits or rolls back with the domain change.
#[derive(Debug, Clone, Default)]
pub struct OutboxAppender<G> {
    generator: G,
}

impl<G: PayloadGenerator> OutboxAppender<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Registers the event `kind` produced by `source`.
    ///
    /// Returns the token assigned to the new record.
    #[tracing::instrument(skip(self, writer, source))]
    pub async fn append<W>(
        &self,
        writer: &mut W,
        kind: G::Kind,
        source: &G::Source,
    ) -> Result<EventToken>
    where
        W: OutboxWriter + ?Sized,
    {
        let envelope = EventEnvelope::new(self.generator.generate(kind, source)?);
        let record = NewOutboxRecord::register(self.generator.entity_key(source), envelope.to_json()?);
        let token = record.event_token;

        writer.insert(record).await?;

        metrics::counter!("outbox_records_appended", "event_type" => envelope.event_type().as_str())
            .increment(1);
        tracing::debug!(
            event_token = %token,
            event_id = %envelope.event_id,
            event_type = %envelope.event_type(),
            "event registered in outbox"
        );

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryOutboxStore, OutboxStatus, OutboxStore};
    use common::OrderId;
    use events::{EventType, OrderCancelled};

    struct CancelledOrder {
        id: i64,
    }

    struct TestGenerator;

    impl PayloadGenerator for TestGenerator {
        type Kind = ();
        type Source = CancelledOrder;

        fn generate(&self, _kind: (), source: &CancelledOrder) -> Result<EventPayload> {
            Ok(EventPayload::OrderCancelled(OrderCancelled {
                order_id: OrderId::new(source.id),
                cancelled_at: chrono::Utc::now(),
            }))
        }

        fn entity_key(&self, source: &CancelledOrder) -> String {
            source.id.to_string()
        }
    }

    #[tokio::test]
    async fn append_registers_rendered_envelope() {
        let store = InMemoryOutboxStore::new();
        let appender = OutboxAppender::new(TestGenerator);

        let mut tx = store.begin();
        let token = appender
            .append(&mut tx, (), &CancelledOrder { id: 42 })
            .await
            .unwrap();
        tx.commit().await;

        let record = store.find_by_token(token).await.unwrap().unwrap();
        assert_eq!(record.status, OutboxStatus::Registered);
        assert_eq!(record.entity_key, "42");
        assert!(record.published_at.is_none());

        let envelope = EventEnvelope::from_json(&record.payload).unwrap();
        assert_eq!(envelope.event_type(), EventType::OrderCancelled);
        assert_eq!(envelope.payload.order_id(), OrderId::new(42));
    }

    #[tokio::test]
    async fn rolled_back_append_leaves_no_record() {
        let store = InMemoryOutboxStore::new();
        let appender = OutboxAppender::new(TestGenerator);

        let mut tx = store.begin();
        appender
            .append(&mut tx, (), &CancelledOrder { id: 1 })
            .await
            .unwrap();
        drop(tx);

        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn every_append_gets_a_fresh_token() {
        let store = InMemoryOutboxStore::new();
        let appender = OutboxAppender::new(TestGenerator);

        let mut tx = store.begin();
        let first = appender.append(&mut tx, (), &CancelledOrder { id: 1 }).await.unwrap();
        let second = appender.append(&mut tx, (), &CancelledOrder { id: 1 }).await.unwrap();
        tx.commit().await;

        assert_ne!(first, second);
        assert_eq!(store.record_count().await, 2);
    }
}
