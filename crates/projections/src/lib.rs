//! Read side of the logistics platform.
//!
//! Events from the order, dispatch and delivery topics are folded into one
//! denormalized [`OrderProjection`] per order:
//! - [`EventConsumer`] pulls envelopes off a topic and hands them to the engine
//! - [`ProjectionEngine`] resolves the [`ProjectionHandler`] for each event type
//!   and persists the result through the [`ProjectionStore`]
//! - [`QueryOrchestrator`] serves reads from the cache, then the document
//!   store, then the write-side services

pub mod cache;
pub mod consumer;
pub mod document;
pub mod engine;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod model;
pub mod origin;
pub mod query;
pub mod store;

pub use cache::{MokaProjectionCache, ProjectionCache};
pub use consumer::EventConsumer;
pub use document::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
pub use engine::ProjectionEngine;
pub use error::{OriginError, ProjectionError, QueryError, Result};
pub use handler::{HandlerRegistry, ProjectionHandler};
pub use model::{DeliveryInfo, DispatchInfo, OrderInfo, OrderProgress, OrderProjection};
pub use origin::{
    DeliveryOrigin, DispatchOrigin, HttpOriginServices, OrderOrigin, OriginEndpoints,
    OriginServices,
};
pub use query::{FallbackConfig, QueryOrchestrator};
pub use store::ProjectionStore;
