//! Handler trait and the registry that resolves one handler per event type.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use events::{EventEnvelope, EventType};

use crate::handlers;
use crate::model::OrderProjection;
use crate::{ProjectionError, Result};

/// Folds one event type into an order projection.
///
/// `handle` is pure: creation handlers manufacture a projection and ignore
/// `existing`, update handlers return a modified copy of `existing`.
pub trait ProjectionHandler: Send + Sync {
    /// The single event type this handler supports.
    fn event_type(&self) -> EventType;

    /// Returns true if the handler builds a projection from nothing.
    fn creates_projection(&self) -> bool {
        false
    }

    fn handle(
        &self,
        existing: Option<&OrderProjection>,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<OrderProjection>;
}

/// Static map from event type to its handler.
///
/// Built once at startup; every [`EventType`] must have exactly one handler.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<EventType, Arc<dyn ProjectionHandler>>,
}

impl HandlerRegistry {
    /// Builds a registry, rejecting duplicate or missing handlers.
    pub fn new(handlers: Vec<Arc<dyn ProjectionHandler>>) -> Result<Self> {
        let mut map: HashMap<EventType, Arc<dyn ProjectionHandler>> = HashMap::new();
        for handler in handlers {
            let event_type = handler.event_type();
            if map.insert(event_type, handler).is_some() {
                return Err(ProjectionError::DuplicateHandler(event_type));
            }
        }

        if let Some(missing) = EventType::ALL.iter().find(|t| !map.contains_key(*t)) {
            return Err(ProjectionError::NoHandler(*missing));
        }

        Ok(Self { handlers: map })
    }

    /// Registry with the built-in handler for every event type.
    pub fn standard() -> Result<Self> {
        Self::new(handlers::all())
    }

    /// Returns the handler for `event_type`.
    pub fn get(&self, event_type: EventType) -> Result<&Arc<dyn ProjectionHandler>> {
        self.handlers
            .get(&event_type)
            .ok_or(ProjectionError::NoHandler(event_type))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("event_types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{OrderCancelledHandler, OrderCreatedHandler};

    #[test]
    fn test_standard_registry_covers_every_type() {
        let registry = HandlerRegistry::standard().unwrap();
        assert_eq!(registry.len(), EventType::ALL.len());
        for event_type in EventType::ALL {
            assert_eq!(registry.get(event_type).unwrap().event_type(), event_type);
        }
    }

    #[test]
    fn test_duplicate_handler_is_rejected() {
        let mut handlers = handlers::all();
        handlers.push(Arc::new(OrderCreatedHandler));

        let result = HandlerRegistry::new(handlers);
        assert!(matches!(
            result,
            Err(ProjectionError::DuplicateHandler(EventType::OrderCreated))
        ));
    }

    #[test]
    fn test_missing_handler_is_rejected() {
        let handlers: Vec<Arc<dyn ProjectionHandler>> =
            vec![Arc::new(OrderCreatedHandler), Arc::new(OrderCancelledHandler)];

        let result = HandlerRegistry::new(handlers);
        assert!(matches!(result, Err(ProjectionError::NoHandler(_))));
    }

    #[test]
    fn test_only_order_created_creates_projections() {
        let registry = HandlerRegistry::standard().unwrap();
        let creators: Vec<_> = EventType::ALL
            .into_iter()
            .filter(|t| registry.get(*t).unwrap().creates_projection())
            .collect();
        assert_eq!(creators, vec![EventType::OrderCreated]);
    }
}
