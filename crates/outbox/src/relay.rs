//! Periodic driver of the outbox publisher.

use std::time::Duration;

use event_bus::EventBus;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{OutboxPublisher, store::OutboxStore};

/// Runs [`OutboxPublisher::publish`] on a fixed interval until shut down.
///
/// Runs never overlap: the next tick is awaited only after the current run
/// finishes, and ticks missed while a run was slow are delayed, not burst.
pub struct OutboxRelay<S, B> {
    publisher: OutboxPublisher<S, B>,
    interval: Duration,
    batch_size: usize,
}

impl<S, B> OutboxRelay<S, B>
where
    S: OutboxStore + 'static,
    B: EventBus + 'static,
{
    pub fn new(publisher: OutboxPublisher<S, B>, interval: Duration, batch_size: usize) -> Self {
        Self {
            publisher,
            interval,
            batch_size,
        }
    }

    /// Spawns the relay loop on the runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Runs the relay loop until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            batch_size = self.batch_size,
            "starting outbox relay"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    tick_count += 1;
                    match self.publisher.publish(self.batch_size).await {
                        Ok(report) if report.selected > 0 => {
                            tracing::info!(
                                tick = tick_count,
                                selected = report.selected,
                                published = report.published,
                                failed = report.failed,
                                "outbox relay run complete"
                            );
                        }
                        Ok(_) => {
                            tracing::debug!(tick = tick_count, "no registered outbox records");
                        }
                        Err(e) => {
                            tracing::error!(tick = tick_count, error = %e, "outbox relay run failed");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(ticks = tick_count, "outbox relay stopped");
    }
}
