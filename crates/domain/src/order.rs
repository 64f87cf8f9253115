//! Order source.

use chrono::{DateTime, Utc};
use common::OrderId;
use events::{
    EventPayload, OrderCancelled, OrderCreated, OrderDestinationChanged, OrderItem, OrderLocation,
};
use outbox::PayloadGenerator;
use serde::{Deserialize, Serialize};

use crate::{DomainError, Result, missing_data};

/// The state of an order.
///
/// State transitions:
/// ```text
/// Created ──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the destination can still change.
    pub fn can_change_destination(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Wire name, as carried in `order_status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an order after its latest mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: String,
    status: OrderStatus,
    origin: OrderLocation,
    destination: OrderLocation,
    items: Vec<OrderItem>,
    ordered_at: DateTime<Utc>,
    destination_changed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates a new order.
    ///
    /// Requires a non-empty order number and at least one item, each with a
    /// positive quantity.
    pub fn create(
        id: OrderId,
        order_number: impl Into<String>,
        origin: OrderLocation,
        destination: OrderLocation,
        items: Vec<OrderItem>,
        ordered_at: DateTime<Utc>,
    ) -> Result<Self> {
        let order_number = order_number.into();
        if order_number.trim().is_empty() {
            return Err(DomainError::OrderNumberRequired);
        }
        if items.is_empty() {
            return Err(DomainError::NoItems);
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                item_name: item.item_name.clone(),
            });
        }

        Ok(Self {
            id,
            order_number,
            status: OrderStatus::Created,
            origin,
            destination,
            items,
            ordered_at,
            destination_changed_at: None,
            cancelled_at: None,
        })
    }

    pub fn change_destination(
        &mut self,
        destination: OrderLocation,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_change_destination() {
            return Err(self.invalid_transition("change destination of"));
        }
        self.destination = destination;
        self.destination_changed_at = Some(at);
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_cancel() {
            return Err(self.invalid_transition("cancel"));
        }
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(at);
        Ok(())
    }

    fn invalid_transition(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            aggregate: "order",
            current_state: self.status.as_str(),
            action,
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn origin(&self) -> &OrderLocation {
        &self.origin
    }

    pub fn destination(&self) -> &OrderLocation {
        &self.destination
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn ordered_at(&self) -> DateTime<Utc> {
        self.ordered_at
    }

    pub fn destination_changed_at(&self) -> Option<DateTime<Utc>> {
        self.destination_changed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }
}

/// Events emitted by the order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEventKind {
    Created,
    DestinationChanged,
    Cancelled,
}

/// Renders order events; the entity key is the order id.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderPayloadGenerator;

impl PayloadGenerator for OrderPayloadGenerator {
    type Kind = OrderEventKind;
    type Source = Order;

    fn generate(&self, kind: OrderEventKind, order: &Order) -> outbox::Result<EventPayload> {
        let payload = match kind {
            OrderEventKind::Created => EventPayload::OrderCreated(OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
                order_status: order.status.as_str().to_string(),
                origin_location: order.origin.clone(),
                destination_location: order.destination.clone(),
                items: order.items.clone(),
                ordered_at: order.ordered_at,
            }),
            OrderEventKind::DestinationChanged => {
                let changed_at = order
                    .destination_changed_at
                    .ok_or_else(|| missing_data(kind, "destination never changed"))?;
                EventPayload::OrderDestinationChanged(OrderDestinationChanged {
                    order_id: order.id,
                    destination_location: order.destination.clone(),
                    changed_at,
                })
            }
            OrderEventKind::Cancelled => {
                let cancelled_at = order
                    .cancelled_at
                    .ok_or_else(|| missing_data(kind, "order is not cancelled"))?;
                EventPayload::OrderCancelled(OrderCancelled {
                    order_id: order.id,
                    cancelled_at,
                })
            }
        };
        Ok(payload)
    }

    fn entity_key(&self, order: &Order) -> String {
        order.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use events::EventType;

    fn location(name: &str) -> OrderLocation {
        OrderLocation {
            contact_name: name.to_string(),
            contact_phone_number: "010-1234-5678".to_string(),
            latitude: 37.5665,
            longitude: 126.978,
            jibun_address: "Seoul Jung-gu Taepyeongno 1ga 31".to_string(),
            road_address: "Seoul Jung-gu Sejong-daero 110".to_string(),
            detail_address: None,
        }
    }

    fn item(name: &str, quantity: u32, price: i64) -> OrderItem {
        OrderItem {
            item_name: name.to_string(),
            quantity,
            price: Money::new(price),
        }
    }

    fn create_order(id: i64) -> Order {
        Order::create(
            OrderId::new(id),
            format!("ORD-{id}"),
            location("store"),
            location("customer"),
            vec![item("coffee", 2, 4500), item("bagel", 1, 3000)],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_order() {
        let order = create_order(42);
        assert_eq!(order.id(), OrderId::new(42));
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.items().len(), 2);
        assert!(order.cancelled_at().is_none());
    }

    #[test]
    fn test_create_order_without_items_fails() {
        let result = Order::create(
            OrderId::new(1),
            "ORD-1",
            location("store"),
            location("customer"),
            vec![],
            Utc::now(),
        );
        assert_eq!(result, Err(DomainError::NoItems));
    }

    #[test]
    fn test_create_order_zero_quantity_fails() {
        let result = Order::create(
            OrderId::new(1),
            "ORD-1",
            location("store"),
            location("customer"),
            vec![item("coffee", 0, 4500)],
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_change_destination() {
        let mut order = create_order(1);
        let mut destination = location("office");
        destination.detail_address = Some("3rd floor".to_string());

        order.change_destination(destination.clone(), Utc::now()).unwrap();

        assert_eq!(order.destination(), &destination);
        assert!(order.destination_changed_at().is_some());
    }

    #[test]
    fn test_cancelled_order_rejects_changes() {
        let mut order = create_order(1);
        order.cancel(Utc::now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        assert!(matches!(
            order.cancel(Utc::now()),
            Err(DomainError::InvalidStateTransition { action: "cancel", .. })
        ));
        assert!(order.change_destination(location("office"), Utc::now()).is_err());
    }

    #[test]
    fn test_generate_created_payload() {
        let order = create_order(42);
        let payload = OrderPayloadGenerator
            .generate(OrderEventKind::Created, &order)
            .unwrap();

        assert_eq!(payload.event_type(), EventType::OrderCreated);
        let EventPayload::OrderCreated(created) = payload else {
            panic!("expected order created payload");
        };
        assert_eq!(created.order_number, "ORD-42");
        assert_eq!(created.order_status, "CREATED");
        assert_eq!(created.items.len(), 2);
        assert_eq!(OrderPayloadGenerator.entity_key(&order), "42");
    }

    #[test]
    fn test_generate_cancelled_requires_cancellation() {
        let mut order = create_order(1);
        assert!(
            OrderPayloadGenerator
                .generate(OrderEventKind::Cancelled, &order)
                .is_err()
        );

        order.cancel(Utc::now()).unwrap();
        let payload = OrderPayloadGenerator
            .generate(OrderEventKind::Cancelled, &order)
            .unwrap();
        assert_eq!(payload.event_type(), EventType::OrderCancelled);
    }

    #[test]
    fn test_generate_destination_changed() {
        let mut order = create_order(1);
        order.change_destination(location("office"), Utc::now()).unwrap();

        let payload = OrderPayloadGenerator
            .generate(OrderEventKind::DestinationChanged, &order)
            .unwrap();
        let EventPayload::OrderDestinationChanged(changed) = payload else {
            panic!("expected destination changed payload");
        };
        assert_eq!(changed.destination_location.contact_name, "office");
    }
}
