//! Outbox relay entry point.

use event_bus::NatsBus;
use outbox::{OutboxPublisher, OutboxRelay, PostgresOutboxStore, RelayConfig};
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
            tracing::info!("received SIGINT, stopping relay");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, stopping relay");
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = RelayConfig::from_env();

    // 1. Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // 2. Connect to the outbox database and the broker
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let store = PostgresOutboxStore::new(pool);
    store
        .run_migrations()
        .await
        .expect("failed to run outbox migrations");

    let bus = NatsBus::connect(&config.nats_url)
        .await
        .expect("failed to connect to NATS");

    // 3. Run the relay until shutdown
    let publisher = OutboxPublisher::new(store, bus)
        .with_publish_timeout(config.publish_timeout)
        .with_poll_order(config.poll_order);
    let relay = OutboxRelay::new(publisher, config.interval, config.batch_size);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = relay.spawn(shutdown_rx);

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.await {
        tracing::error!(error = %e, "relay task failed");
    }

    tracing::info!("outbox relay shut down gracefully");
}
