//! Domain error types.

use thiserror::Error;

/// Errors that can occur when mutating a write-side source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The source is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} {aggregate} in {current_state} state")]
    InvalidStateTransition {
        aggregate: &'static str,
        current_state: &'static str,
        action: &'static str,
    },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {item_name}: must be greater than 0")]
    InvalidQuantity { item_name: String },

    /// Order number is required.
    #[error("Order number is required")]
    OrderNumberRequired,
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
