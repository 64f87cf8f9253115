//! Tiered read path: cache, document store, then the write-side services.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::OrderId;

use crate::error::{OriginError, QueryError};
use crate::model::{DeliveryInfo, DispatchInfo, OrderInfo, OrderProjection};
use crate::origin::{DeliveryOrigin, DispatchOrigin, OrderOrigin, OriginServices};
use crate::store::ProjectionStore;

/// Default bound on each origin call.
pub const DEFAULT_ORIGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for rebuilding a projection from the write-side services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub order_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub delivery_timeout: Duration,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order_timeout: DEFAULT_ORIGIN_TIMEOUT,
            dispatch_timeout: DEFAULT_ORIGIN_TIMEOUT,
            delivery_timeout: DEFAULT_ORIGIN_TIMEOUT,
        }
    }
}

/// Answers "what is the current state of order X".
///
/// Read order:
/// 1. cache hit: returned as is
/// 2. document hit: returned, and the cache is repopulated in the background
/// 3. fallback: order, dispatch and delivery services queried in parallel;
///    the order is required, the other two default to "no data yet" on error
///    or timeout. The rebuilt projection is written to the document store.
/// 4. otherwise [`QueryError::NotFound`]
///
/// Storage errors on the read path count as misses.
#[derive(Clone)]
pub struct QueryOrchestrator {
    store: ProjectionStore,
    origins: Arc<dyn OriginServices>,
    fallback: FallbackConfig,
}

impl QueryOrchestrator {
    pub fn new(
        store: ProjectionStore,
        origins: Arc<dyn OriginServices>,
        fallback: FallbackConfig,
    ) -> Self {
        Self {
            store,
            origins,
            fallback,
        }
    }

    pub fn store(&self) -> &ProjectionStore {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, order_id: OrderId) -> Result<OrderProjection, QueryError> {
        match self.store.cache().get(order_id).await {
            Ok(Some(projection)) => {
                metrics::counter!("read_model_reads", "tier" => "cache").increment(1);
                tracing::debug!("cache hit");
                return Ok(projection);
            }
            Ok(None) => tracing::debug!("cache miss"),
            Err(e) => tracing::warn!(error = %e, "cache read failed, treating as miss"),
        }

        match self.store.documents().find(order_id).await {
            Ok(Some(projection)) => {
                metrics::counter!("read_model_reads", "tier" => "document").increment(1);
                tracing::debug!("document hit");
                self.repopulate_cache(&projection);
                return Ok(projection);
            }
            Ok(None) => tracing::debug!("document miss"),
            Err(e) => tracing::warn!(error = %e, "document read failed, treating as miss"),
        }

        if self.fallback.enabled {
            tracing::warn!("projection not found, falling back to origin services");
            if let Some(projection) = self.rebuild_from_origins(order_id).await {
                metrics::counter!("read_model_reads", "tier" => "fallback").increment(1);
                if let Err(e) = self.store.documents().save(&projection).await {
                    tracing::warn!(error = %e, "failed to persist rebuilt projection");
                }
                return Ok(projection);
            }
        }

        metrics::counter!("read_model_not_found").increment(1);
        tracing::info!("order not found in any tier");
        Err(QueryError::NotFound(order_id))
    }

    /// Writes `projection` to the cache without waiting for the result.
    fn repopulate_cache(&self, projection: &OrderProjection) {
        let cache = Arc::clone(self.store.cache());
        let projection = projection.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.put(&projection).await {
                tracing::debug!(order_id = %projection.order_id, error = %e, "cache repopulation failed");
            }
        });
    }

    async fn rebuild_from_origins(&self, order_id: OrderId) -> Option<OrderProjection> {
        let (order, dispatch, delivery) = tokio::join!(
            bounded(
                "order",
                self.fallback.order_timeout,
                self.origins.get_order(order_id)
            ),
            bounded(
                "dispatch",
                self.fallback.dispatch_timeout,
                self.origins.get_dispatch_by_order_id(order_id)
            ),
            bounded(
                "delivery",
                self.fallback.delivery_timeout,
                self.origins.get_delivery_by_order_id(order_id)
            ),
        );

        let order = order?;
        tracing::info!(
            has_dispatch = dispatch.is_some(),
            has_delivery = delivery.is_some(),
            "rebuilt projection from origin services"
        );
        Some(reconstruct(order, dispatch, delivery, Utc::now()))
    }
}

impl std::fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

/// Awaits an origin call for at most `limit`; errors and timeouts become `None`.
async fn bounded<T>(
    service: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<Option<T>, OriginError>>,
) -> Option<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(data)) => data,
        Ok(Err(e)) => {
            tracing::warn!(service, error = %e, "origin call failed");
            None
        }
        Err(_) => {
            tracing::warn!(service, timeout_ms = limit.as_millis() as u64, "origin call timed out");
            None
        }
    }
}

/// Combines origin responses into a projection.
pub fn reconstruct(
    order: OrderOrigin,
    dispatch: Option<DispatchOrigin>,
    delivery: Option<DeliveryOrigin>,
    now: DateTime<Utc>,
) -> OrderProjection {
    let order_info = OrderInfo {
        order_number: order.order_number,
        order_status: order.order_status.unwrap_or_else(|| "CREATED".to_string()),
        origin_location: order.origin_location,
        destination_location: order.destination_location,
        items: order.items,
        ordered_at: order.ordered_at.unwrap_or(now),
        cancelled_at: order.cancelled_at,
    };

    let mut projection = OrderProjection::new(order.order_id, order_info, now);

    if let Some(dispatch) = dispatch {
        projection.dispatch_id = Some(dispatch.dispatch_id);
        projection.dispatch_info = Some(DispatchInfo {
            agent_id: dispatch.agent_id,
            suggested_fee: dispatch.delivery_fee,
            requested_at: dispatch.requested_at,
            dispatched_at: dispatch.dispatched_at,
        });
    }

    if let Some(delivery) = delivery {
        projection.delivery_id = Some(delivery.delivery_id);
        projection.delivery_info = Some(DeliveryInfo {
            delivery_number: delivery.delivery_number,
            agent_id: delivery.agent_id,
            delivery_fee: delivery.delivery_fee,
            delivery_status: delivery.delivery_status,
            started_at: delivery.started_at,
            picked_up_at: delivery.picked_up_at,
            delivered_at: delivery.delivered_at,
            cancelled_at: delivery.cancelled_at,
            cancel_reason: None,
        });
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AgentId, DispatchId, Money};

    fn order_origin(id: i64) -> OrderOrigin {
        OrderOrigin {
            order_id: OrderId::new(id),
            order_number: format!("ORD-{id}"),
            order_status: None,
            origin_location: None,
            destination_location: None,
            items: vec![],
            ordered_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_reconstruct_order_only() {
        let now = Utc::now();
        let projection = reconstruct(order_origin(42), None, None, now);

        assert_eq!(projection.order_id, OrderId::new(42));
        assert_eq!(projection.order_info.order_status, "CREATED");
        assert_eq!(projection.order_info.ordered_at, now);
        assert!(projection.dispatch_info.is_none());
        assert!(projection.delivery_info.is_none());
    }

    #[test]
    fn test_reconstruct_with_dispatch() {
        let dispatch = DispatchOrigin {
            dispatch_id: DispatchId::new(10),
            order_id: OrderId::new(42),
            agent_id: Some(AgentId::new(7)),
            delivery_fee: Some(Money::new(3000)),
            requested_at: None,
            dispatched_at: Some(Utc::now()),
            status: Some("DISPATCHED".to_string()),
        };

        let projection = reconstruct(order_origin(42), Some(dispatch), None, Utc::now());

        assert_eq!(projection.dispatch_id, Some(DispatchId::new(10)));
        let info = projection.dispatch_info.unwrap();
        assert_eq!(info.agent_id, Some(AgentId::new(7)));
        assert_eq!(info.suggested_fee, Some(Money::new(3000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_call_times_out_to_none() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, OriginError>(Some(1))
        };
        assert_eq!(bounded("dispatch", Duration::from_secs(5), slow).await, None);
    }

    #[tokio::test]
    async fn test_bounded_call_error_is_none() {
        let failing = async {
            Err::<Option<u8>, _>(OriginError::Status {
                service: "delivery",
                status: 503,
            })
        };
        assert_eq!(bounded("delivery", Duration::from_secs(5), failing).await, None);
    }
}
