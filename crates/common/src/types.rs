use serde::{Deserialize, Serialize};

/// Declares a numeric identifier newtype.
///
/// Identifiers are assigned by the owning write-side service (database sequences),
/// so they wrap an `i64` rather than a generated UUID.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of an order, owned by the order service.
    ///
    /// Also the key of the read-side projection.
    OrderId
);

numeric_id!(
    /// Identifier of a dispatch, owned by the dispatch service.
    DispatchId
);

numeric_id!(
    /// Identifier of a delivery, owned by the delivery service.
    DeliveryId
);

numeric_id!(
    /// Identifier of the delivery agent a dispatch was assigned to.
    AgentId
);

/// An amount of money in the smallest currency unit (won).
///
/// Serialized as a bare integer so `3000` on the wire is `Money::new(3000)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount.
    pub fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns the raw amount.
    pub fn amount(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
