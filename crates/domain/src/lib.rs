//! Write-side sources of domain events.
//!
//! Each module holds one domain service's aggregate snapshot, the kinds of
//! events it emits and the [`outbox::PayloadGenerator`] that renders them:
//! - [`order`]: created, destination changed, cancelled
//! - [`dispatch`]: requested, dispatched
//! - [`delivery`]: started, picked up, delivered, cancelled
//!
//! A service mutates the snapshot, then appends the matching event kind through
//! an [`outbox::OutboxAppender`] inside the same transaction.

pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod order;

pub use delivery::{Delivery, DeliveryEventKind, DeliveryPayloadGenerator, DeliveryStatus};
pub use dispatch::{Dispatch, DispatchEventKind, DispatchPayloadGenerator, DispatchStatus};
pub use error::{DomainError, Result};
pub use order::{Order, OrderEventKind, OrderPayloadGenerator, OrderStatus};

/// Builds the error a generator returns when `kind` needs data `source` lacks.
pub(crate) fn missing_data(kind: impl std::fmt::Debug, reason: &str) -> outbox::OutboxError {
    outbox::OutboxError::Generation {
        kind: format!("{kind:?}"),
        reason: reason.to_string(),
    }
}
