//! Two-tier projection persistence.

use std::sync::Arc;

use common::OrderId;

use crate::cache::ProjectionCache;
use crate::document::DocumentStore;
use crate::model::OrderProjection;

/// Writes projections to the cache and the document store.
///
/// The tiers are written independently. A failure in one tier is logged and
/// counted, never rolled back and never propagated; reads heal the cache from
/// the document store.
#[derive(Clone)]
pub struct ProjectionStore {
    cache: Arc<dyn ProjectionCache>,
    documents: Arc<dyn DocumentStore>,
}

impl ProjectionStore {
    pub fn new(cache: Arc<dyn ProjectionCache>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { cache, documents }
    }

    pub fn cache(&self) -> &Arc<dyn ProjectionCache> {
        &self.cache
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    /// Persists `projection` to both tiers.
    #[tracing::instrument(skip(self, projection), fields(order_id = %projection.order_id))]
    pub async fn save(&self, projection: &OrderProjection) {
        if let Err(e) = self.cache.put(projection).await {
            metrics::counter!("projection_store_write_failures", "tier" => "cache").increment(1);
            tracing::warn!(error = %e, "failed to write projection to cache");
        }

        if let Err(e) = self.documents.save(projection).await {
            metrics::counter!("projection_store_write_failures", "tier" => "document")
                .increment(1);
            tracing::error!(error = %e, "failed to write projection to document store");
        }
    }

    /// Loads the current projection, cache first.
    ///
    /// Storage errors count as a miss.
    pub async fn load(&self, order_id: OrderId) -> Option<OrderProjection> {
        match self.cache.get(order_id).await {
            Ok(Some(projection)) => return Some(projection),
            Ok(None) => {}
            Err(e) => tracing::warn!(%order_id, error = %e, "cache read failed, treating as miss"),
        }

        match self.documents.find(order_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%order_id, error = %e, "document read failed, treating as miss");
                None
            }
        }
    }

    /// Removes the projection from both tiers.
    ///
    /// Returns true if the document store held it.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, order_id: OrderId) -> bool {
        if let Err(e) = self.cache.remove(order_id).await {
            tracing::warn!(error = %e, "failed to remove projection from cache");
        }

        match self.documents.delete(order_id).await {
            Ok(existed) => existed,
            Err(e) => {
                tracing::error!(error = %e, "failed to remove projection from document store");
                false
            }
        }
    }
}

impl std::fmt::Debug for ProjectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaProjectionCache;
    use crate::document::InMemoryDocumentStore;
    use crate::model::tests::order_created;
    use chrono::Utc;

    fn store() -> (ProjectionStore, MokaProjectionCache, InMemoryDocumentStore) {
        let cache = MokaProjectionCache::default();
        let documents = InMemoryDocumentStore::new();
        let store = ProjectionStore::new(Arc::new(cache.clone()), Arc::new(documents.clone()));
        (store, cache, documents)
    }

    #[tokio::test]
    async fn test_save_writes_both_tiers() {
        let (store, cache, documents) = store();
        let projection = OrderProjection::from_order_created(&order_created(42), Utc::now());

        store.save(&projection).await;

        assert_eq!(cache.get(OrderId::new(42)).await.unwrap(), Some(projection.clone()));
        assert_eq!(documents.find(OrderId::new(42)).await.unwrap(), Some(projection));
    }

    #[tokio::test]
    async fn test_load_falls_back_to_documents() {
        let (store, _cache, documents) = store();
        let projection = OrderProjection::from_order_created(&order_created(7), Utc::now());
        documents.save(&projection).await.unwrap();

        assert_eq!(store.load(OrderId::new(7)).await, Some(projection));
        assert_eq!(store.load(OrderId::new(8)).await, None);
    }

    #[tokio::test]
    async fn test_delete_clears_both_tiers() {
        let (store, cache, documents) = store();
        let projection = OrderProjection::from_order_created(&order_created(1), Utc::now());
        store.save(&projection).await;

        assert!(store.delete(OrderId::new(1)).await);
        assert!(cache.get(OrderId::new(1)).await.unwrap().is_none());
        assert!(documents.is_empty().await);
        assert!(!store.delete(OrderId::new(1)).await);
    }
}
