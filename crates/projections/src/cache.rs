//! Cache tier of the read model.

use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use moka::future::Cache;

use crate::Result;
use crate::model::OrderProjection;

/// Default time-to-live of a cached projection.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default upper bound on cached projections.
pub const DEFAULT_CACHE_CAPACITY: u64 = 100_000;

/// Fast, lossy tier keyed by order id.
///
/// Entries expire after a TTL; there is no invalidation from the document tier.
#[async_trait]
pub trait ProjectionCache: Send + Sync {
    async fn get(&self, order_id: OrderId) -> Result<Option<OrderProjection>>;

    async fn put(&self, projection: &OrderProjection) -> Result<()>;

    async fn remove(&self, order_id: OrderId) -> Result<()>;
}

/// In-process cache backed by `moka`.
#[derive(Clone)]
pub struct MokaProjectionCache {
    cache: Cache<OrderId, OrderProjection>,
}

impl MokaProjectionCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        tracing::info!(
            ttl_secs = ttl.as_secs(),
            max_capacity,
            "projection cache initialized"
        );

        Self { cache }
    }

    /// Number of cached projections (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaProjectionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl ProjectionCache for MokaProjectionCache {
    async fn get(&self, order_id: OrderId) -> Result<Option<OrderProjection>> {
        Ok(self.cache.get(&order_id).await)
    }

    async fn put(&self, projection: &OrderProjection) -> Result<()> {
        self.cache
            .insert(projection.order_id, projection.clone())
            .await;
        Ok(())
    }

    async fn remove(&self, order_id: OrderId) -> Result<()> {
        self.cache.invalidate(&order_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::order_created;
    use chrono::Utc;

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = MokaProjectionCache::default();
        let projection = OrderProjection::from_order_created(&order_created(42), Utc::now());

        assert!(cache.get(OrderId::new(42)).await.unwrap().is_none());
        cache.put(&projection).await.unwrap();
        assert_eq!(cache.get(OrderId::new(42)).await.unwrap(), Some(projection));
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = MokaProjectionCache::default();
        let projection = OrderProjection::from_order_created(&order_created(1), Utc::now());
        cache.put(&projection).await.unwrap();

        cache.remove(OrderId::new(1)).await.unwrap();
        assert!(cache.get(OrderId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = MokaProjectionCache::new(Duration::from_millis(50), 10);
        let projection = OrderProjection::from_order_created(&order_created(1), Utc::now());
        cache.put(&projection).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(OrderId::new(1)).await.unwrap().is_none());
    }
}
