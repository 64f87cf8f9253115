//! Shared identifier and value types used by every logistics service.

pub mod types;

pub use types::{AgentId, DeliveryId, DispatchId, Money, OrderId};
