//! Transactional outbox.
//!
//! A write-side service registers the events a state change implies in the same
//! database transaction as the change itself ([`OutboxAppender`]). A periodic
//! relay ([`OutboxRelay`] driving [`OutboxPublisher`]) later forwards registered
//! records to the broker and marks them published, giving at-least-once delivery.

pub mod appender;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod publisher;
pub mod record;
pub mod relay;
pub mod store;

pub use appender::{OutboxAppender, PayloadGenerator};
pub use config::RelayConfig;
pub use error::{OutboxError, Result};
pub use memory::{InMemoryOutboxStore, InMemoryTransaction};
pub use postgres::PostgresOutboxStore;
pub use publisher::{OutboxPublisher, PublishReport};
pub use record::{EventToken, NewOutboxRecord, OutboxRecord, OutboxStatus, PollOrder};
pub use relay::OutboxRelay;
pub use store::{OutboxStore, OutboxWriter};
