use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    EventToken, NewOutboxRecord, OutboxRecord, OutboxStatus, PollOrder, Result,
    store::{OutboxStore, OutboxWriter},
};

/// In-memory outbox store for testing.
///
/// Mirrors the Postgres store, including transactional visibility: records are
/// inserted through an [`InMemoryTransaction`] and only become visible on commit.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    records: Arc<RwLock<Vec<OutboxRecord>>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a unit of work. Dropping it without [`InMemoryTransaction::commit`] rolls back.
    pub fn begin(&self) -> InMemoryTransaction {
        InMemoryTransaction {
            store: self.clone(),
            staged: Vec::new(),
        }
    }

    /// Returns every committed record in insertion order.
    pub async fn records(&self) -> Vec<OutboxRecord> {
        self.records.read().await.clone()
    }

    /// Returns the total number of committed records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn fetch_registered(&self, limit: usize, order: PollOrder) -> Result<Vec<OutboxRecord>> {
        let records = self.records.read().await;
        let mut registered: Vec<_> = records
            .iter()
            .filter(|r| r.status == OutboxStatus::Registered)
            .cloned()
            .collect();

        registered.sort_by_key(|r| (r.registered_at, r.id));
        if order == PollOrder::NewestFirst {
            registered.reverse();
        }
        registered.truncate(limit);
        Ok(registered)
    }

    async fn mark_published(&self, id: i64, published_at: DateTime<Utc>) -> Result<bool> {
        let mut records = self.records.write().await;
        match records
            .iter_mut()
            .find(|r| r.id == id && r.status == OutboxStatus::Registered)
        {
            Some(record) => {
                record.status = OutboxStatus::Published;
                record.published_at = Some(published_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_token(&self, token: EventToken) -> Result<Option<OutboxRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.event_token == token).cloned())
    }

    async fn count_by_status(&self, status: OutboxStatus) -> Result<u64> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| r.status == status).count() as u64)
    }
}

/// Staged inserts against an [`InMemoryOutboxStore`].
pub struct InMemoryTransaction {
    store: InMemoryOutboxStore,
    staged: Vec<NewOutboxRecord>,
}

impl InMemoryTransaction {
    /// Makes every staged record visible, assigning sequential ids.
    pub async fn commit(self) {
        let mut records = self.store.records.write().await;
        for new in self.staged {
            let id = records.len() as i64 + 1;
            records.push(OutboxRecord::registered(id, new));
        }
    }

    /// Discards every staged record.
    pub fn rollback(self) {}

    /// Number of records staged so far.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }
}

#[async_trait]
impl OutboxWriter for InMemoryTransaction {
    async fn insert(&mut self, record: NewOutboxRecord) -> Result<()> {
        self.staged.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(store: &InMemoryOutboxStore, count: usize) {
        let mut tx = store.begin();
        for i in 0..count {
            let mut record = NewOutboxRecord::register(i.to_string(), "{}");
            record.registered_at = DateTime::from_timestamp(1_700_000_000 + i as i64, 0).unwrap();
            tx.insert(record).await.unwrap();
        }
        tx.commit().await;
    }

    #[tokio::test]
    async fn staged_records_are_invisible_until_commit() {
        let store = InMemoryOutboxStore::new();
        let mut tx = store.begin();
        tx.insert(NewOutboxRecord::register("1", "{}")).await.unwrap();
        assert_eq!(tx.staged_count(), 1);
        assert_eq!(store.record_count().await, 0);

        tx.commit().await;
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_records() {
        let store = InMemoryOutboxStore::new();
        let mut tx = store.begin();
        tx.insert(NewOutboxRecord::register("1", "{}")).await.unwrap();
        tx.rollback();

        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn fetch_honours_poll_order_and_limit() {
        let store = InMemoryOutboxStore::new();
        seed(&store, 5).await;

        let newest = store.fetch_registered(2, PollOrder::NewestFirst).await.unwrap();
        assert_eq!(newest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 4]);

        let oldest = store.fetch_registered(2, PollOrder::OldestFirst).await.unwrap();
        assert_eq!(oldest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn mark_published_is_one_way() {
        let store = InMemoryOutboxStore::new();
        seed(&store, 1).await;
        let at = Utc::now();

        assert!(store.mark_published(1, at).await.unwrap());
        assert!(!store.mark_published(1, Utc::now()).await.unwrap());

        let record = &store.records().await[0];
        assert_eq!(record.status, OutboxStatus::Published);
        assert_eq!(record.published_at, Some(at));
        assert!(store
            .fetch_registered(10, PollOrder::NewestFirst)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_record_is_not_marked() {
        let store = InMemoryOutboxStore::new();
        assert!(!store.mark_published(99, Utc::now()).await.unwrap());
    }
}
