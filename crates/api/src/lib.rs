//! Read-model service for the logistics platform.
//!
//! Serves the current state of an order from the projection store, keeps the
//! store up to date by consuming the order, dispatch and delivery topics, and
//! exposes structured logs (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use event_bus::EventBus;
use events::EventTopic;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{EventConsumer, ProjectionEngine};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/orders/{order_id}",
            get(routes::orders::get).delete(routes::orders::delete),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Starts one consumer per topic, all stopping when `shutdown` flips.
pub fn spawn_consumers<B>(
    bus: B,
    engine: ProjectionEngine,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<projections::Result<()>>>
where
    B: EventBus + Clone + 'static,
{
    EventTopic::ALL
        .into_iter()
        .map(|topic| EventConsumer::new(bus.clone(), topic, engine.clone()).spawn(shutdown.clone()))
        .collect()
}
