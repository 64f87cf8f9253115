//! Read-model service entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::orders::AppState;
use event_bus::NatsBus;
use projections::{
    HandlerRegistry, HttpOriginServices, MokaProjectionCache, PostgresDocumentStore,
    ProjectionEngine, ProjectionStore, QueryOrchestrator,
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // 1. Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Storage tiers
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let documents = PostgresDocumentStore::new(pool);
    documents
        .run_migrations()
        .await
        .expect("failed to run read-model migrations");

    let cache = MokaProjectionCache::new(config.cache_ttl, config.cache_max_capacity);
    let store = ProjectionStore::new(Arc::new(cache), Arc::new(documents));

    // 4. Topic consumers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumers = if config.consumer_enabled {
        let bus = NatsBus::connect(&config.nats_url)
            .await
            .expect("failed to connect to NATS")
            .with_durable(config.nats_durable.clone());
        let registry = HandlerRegistry::standard().expect("projection handlers are incomplete");
        let engine = ProjectionEngine::new(registry, store.clone());
        api::spawn_consumers(bus, engine, shutdown_rx)
    } else {
        tracing::info!("event consumers disabled");
        Vec::new()
    };

    // 5. Query path
    let origins = HttpOriginServices::new(config.origins.clone(), config.origin_request_timeout())
        .expect("failed to build origin service client");
    let query = QueryOrchestrator::new(store, Arc::new(origins), config.fallback);
    let app = api::create_app(Arc::new(AppState { query }), metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting read-model service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Stop consumers
    let _ = shutdown_tx.send(true);
    for handle in consumers {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "consumer stopped with error"),
            Err(e) => tracing::error!(error = %e, "consumer task failed"),
        }
    }

    tracing::info!("server shut down gracefully");
}
