use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{EventToken, NewOutboxRecord, OutboxRecord, OutboxStatus, PollOrder, Result};

/// Inserts outbox records inside the caller's unit of work.
///
/// Implemented for a Postgres connection, so the caller passes `&mut *tx` of the
/// transaction that also carries the domain mutation; and for
/// [`InMemoryTransaction`](crate::InMemoryTransaction) in tests.
#[async_trait]
pub trait OutboxWriter: Send {
    /// Inserts a `REGISTERED` record. Becomes visible only when the unit of work commits.
    async fn insert(&mut self, record: NewOutboxRecord) -> Result<()>;
}

/// Access to stored outbox records used by the publisher.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Selects up to `limit` records still `REGISTERED`.
    async fn fetch_registered(&self, limit: usize, order: PollOrder) -> Result<Vec<OutboxRecord>>;

    /// Moves a record from `REGISTERED` to `PUBLISHED`.
    ///
    /// Returns `false` when the record was not `REGISTERED` (already published
    /// by a concurrent publisher, or unknown); the status never moves back.
    async fn mark_published(&self, id: i64, published_at: DateTime<Utc>) -> Result<bool>;

    /// Looks up a record by its token.
    async fn find_by_token(&self, token: EventToken) -> Result<Option<OutboxRecord>>;

    /// Counts records in a given status.
    async fn count_by_status(&self, status: OutboxStatus) -> Result<u64>;
}
