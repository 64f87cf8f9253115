//! Forwards registered outbox records to the broker.

use std::time::Duration;

use chrono::Utc;
use event_bus::EventBus;
use events::EventEnvelope;

use crate::{OutboxError, OutboxRecord, PollOrder, Result, store::OutboxStore};

/// Default bound on a single broker publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of one publish run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Records selected from the store.
    pub selected: usize,
    /// Records forwarded and marked published.
    pub published: usize,
    /// Records left `REGISTERED` for the next run.
    pub failed: usize,
}

/// Publishes batches of registered outbox records.
///
/// Each record is handled independently: a failure is logged, the record stays
/// `REGISTERED` and the rest of the batch continues. There is no backoff and no
/// dead-letter state; a record that keeps failing is retried on every run.
pub struct OutboxPublisher<S, B> {
    store: S,
    bus: B,
    publish_timeout: Duration,
    poll_order: PollOrder,
}

impl<S: OutboxStore, B: EventBus> OutboxPublisher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            poll_order: PollOrder::default(),
        }
    }

    /// Sets the bound on each broker publish.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Sets the order in which registered records are selected.
    pub fn with_poll_order(mut self, order: PollOrder) -> Self {
        self.poll_order = order;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Publishes up to `batch_size` registered records.
    ///
    /// Only a failure to read the batch is returned as an error.
    #[tracing::instrument(skip(self))]
    pub async fn publish(&self, batch_size: usize) -> Result<PublishReport> {
        let records = self
            .store
            .fetch_registered(batch_size, self.poll_order)
            .await?;

        let mut report = PublishReport {
            selected: records.len(),
            ..PublishReport::default()
        };

        for record in &records {
            match self.publish_record(record).await {
                Ok(()) => {
                    report.published += 1;
                    metrics::counter!("outbox_records_published").increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("outbox_publish_failures").increment(1);
                    tracing::error!(
                        event_token = %record.event_token,
                        entity_key = %record.entity_key,
                        error = %e,
                        "outbox publish failed, record stays registered"
                    );
                }
            }
        }

        Ok(report)
    }

    async fn publish_record(&self, record: &OutboxRecord) -> Result<()> {
        let topic = EventEnvelope::peek_type(&record.payload)?.topic();
        let payload = record.payload.clone().into_bytes();

        tokio::time::timeout(
            self.publish_timeout,
            self.bus.publish(topic, &record.entity_key, payload),
        )
        .await
        .map_err(|_| OutboxError::PublishTimeout {
            token: record.event_token,
            timeout: self.publish_timeout,
        })??;

        if self.store.mark_published(record.id, Utc::now()).await? {
            tracing::debug!(event_token = %record.event_token, %topic, "outbox record published");
        } else {
            tracing::debug!(
                event_token = %record.event_token,
                "outbox record already published elsewhere"
            );
        }

        Ok(())
    }
}
