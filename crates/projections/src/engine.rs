//! Folds envelopes into stored projections.

use std::sync::Arc;

use chrono::Utc;
use common::OrderId;
use dashmap::DashMap;
use events::EventEnvelope;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::handler::HandlerRegistry;
use crate::model::OrderProjection;
use crate::store::ProjectionStore;
use crate::{ProjectionError, Result};

/// Applies one envelope at a time: resolve the handler, load the projection it
/// updates, compute the next value and persist it.
///
/// Applications for the same order are serialized across clones of the engine,
/// so consumers of different topics never overwrite each other's sections.
/// There is no version guard beyond that; a late event overwrites newer state.
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    registry: Arc<HandlerRegistry>,
    store: ProjectionStore,
    order_locks: Arc<DashMap<OrderId, Arc<Mutex<()>>>>,
}

impl ProjectionEngine {
    pub fn new(registry: HandlerRegistry, store: ProjectionStore) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            order_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> &ProjectionStore {
        &self.store
    }

    /// Applies `envelope` and returns the persisted projection.
    ///
    /// Returns `Ok(None)` when an update arrives for an order with no
    /// projection yet; the event is dropped, not queued.
    #[tracing::instrument(
        skip(self, envelope),
        fields(event_id = %envelope.event_id, event_type = %envelope.event_type())
    )]
    pub async fn apply(&self, envelope: &EventEnvelope) -> Result<Option<OrderProjection>> {
        let order_id = envelope.payload.order_id();
        let guard = self.lock_order(order_id).await;
        let result = self.apply_locked(envelope).await;
        drop(guard);
        self.release_order(order_id);
        result
    }

    async fn lock_order(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        let lock = self.order_locks.entry(order_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Forgets the order's lock once nobody holds or waits on it.
    fn release_order(&self, order_id: OrderId) {
        self.order_locks
            .remove_if(&order_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn apply_locked(&self, envelope: &EventEnvelope) -> Result<Option<OrderProjection>> {
        let event_type = envelope.event_type();
        let handler = self.registry.get(event_type)?;
        let order_id = envelope.payload.order_id();

        let existing = if handler.creates_projection() {
            None
        } else {
            match self.store.load(order_id).await {
                Some(projection) => Some(projection),
                None => {
                    metrics::counter!("projection_events_dropped", "reason" => "missing_projection")
                        .increment(1);
                    tracing::warn!(%order_id, "no projection for update event, dropping");
                    return Ok(None);
                }
            }
        };

        let updated = handler.handle(existing.as_ref(), envelope, Utc::now())?;
        if updated.order_id != order_id {
            return Err(ProjectionError::OrderIdMismatch {
                projection: updated.order_id,
                event: order_id,
            });
        }

        self.store.save(&updated).await;

        metrics::counter!("projection_events_applied", "event_type" => event_type.as_str())
            .increment(1);
        tracing::debug!(%order_id, revision = updated.revision, "projection updated");

        Ok(Some(updated))
    }
}
