//! Order read-model endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AgentId, DeliveryId, DispatchId, Money, OrderId};
use events::{OrderItem, OrderLocation};
use projections::{OrderProjection, QueryOrchestrator};
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub query: QueryOrchestrator,
}

/// Flattened view of an [`OrderProjection`].
///
/// Every field is always present; stages not reached yet are `null`.
/// `order_status` is the order service's own status and `progress` the most
/// advanced stage seen across all three sources.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub order_number: String,
    pub order_status: String,
    pub progress: String,
    pub origin_location: Option<OrderLocation>,
    pub destination_location: Option<OrderLocation>,
    pub order_items: Vec<OrderItem>,
    pub order_ordered_at: DateTime<Utc>,
    pub order_cancelled_at: Option<DateTime<Utc>>,

    pub dispatch_id: Option<DispatchId>,
    pub agent_id: Option<AgentId>,
    pub suggested_fee: Option<Money>,
    pub delivery_fee: Option<Money>,
    pub dispatch_requested_at: Option<DateTime<Utc>>,
    pub dispatch_dispatched_at: Option<DateTime<Utc>>,

    pub delivery_id: Option<DeliveryId>,
    pub delivery_number: Option<String>,
    pub delivery_status: Option<String>,
    pub delivery_started_at: Option<DateTime<Utc>>,
    pub delivery_picked_up_at: Option<DateTime<Utc>>,
    pub delivery_delivered_at: Option<DateTime<Utc>>,
    pub delivery_cancelled_at: Option<DateTime<Utc>>,
    pub delivery_cancel_reason: Option<String>,

    pub updated_at: DateTime<Utc>,
    pub revision: u64,
}

impl From<OrderProjection> for OrderResponse {
    fn from(projection: OrderProjection) -> Self {
        let progress = projection.progress().to_string();
        let dispatch = projection.dispatch_info.unwrap_or_default();
        let delivery = projection.delivery_info.unwrap_or_default();
        let order = projection.order_info;

        Self {
            order_id: projection.order_id,
            order_number: order.order_number,
            order_status: order.order_status,
            progress,
            origin_location: order.origin_location,
            destination_location: order.destination_location,
            order_items: order.items,
            order_ordered_at: order.ordered_at,
            order_cancelled_at: order.cancelled_at,

            dispatch_id: projection.dispatch_id,
            // The delivering agent and the actual fee win over dispatch-time values.
            agent_id: delivery.agent_id.or(dispatch.agent_id),
            suggested_fee: dispatch.suggested_fee,
            delivery_fee: delivery.delivery_fee.or(dispatch.suggested_fee),
            dispatch_requested_at: dispatch.requested_at,
            dispatch_dispatched_at: dispatch.dispatched_at,

            delivery_id: projection.delivery_id,
            delivery_number: delivery.delivery_number,
            delivery_status: delivery.delivery_status,
            delivery_started_at: delivery.started_at,
            delivery_picked_up_at: delivery.picked_up_at,
            delivery_delivered_at: delivery.delivered_at,
            delivery_cancelled_at: delivery.cancelled_at,
            delivery_cancel_reason: delivery.cancel_reason,

            updated_at: projection.updated_at,
            revision: projection.revision,
        }
    }
}

/// GET /orders/:order_id: current state of one order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    let projection = state.query.read(order_id).await?;
    Ok(Json(OrderResponse::from(projection)))
}

/// DELETE /orders/:order_id: drops the projection from every tier.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&order_id)?;

    if state.query.store().delete(order_id).await {
        tracing::info!(%order_id, "projection deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Order {order_id} not found")))
    }
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse::<i64>()
        .map(OrderId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::OrderCreated;

    fn projection() -> OrderProjection {
        let created = OrderCreated {
            order_id: OrderId::new(42),
            order_number: "ORD-42".to_string(),
            order_status: "CREATED".to_string(),
            origin_location: location(),
            destination_location: location(),
            items: vec![],
            ordered_at: Utc::now(),
        };
        OrderProjection::from_order_created(&created, Utc::now())
    }

    fn location() -> OrderLocation {
        OrderLocation {
            contact_name: "Lee".to_string(),
            contact_phone_number: "010-1111-2222".to_string(),
            latitude: 37.4,
            longitude: 127.1,
            jibun_address: "jibun".to_string(),
            road_address: "road".to_string(),
            detail_address: None,
        }
    }

    #[test]
    fn test_response_keeps_missing_stages_as_null() {
        let json = serde_json::to_value(OrderResponse::from(projection())).unwrap();

        assert_eq!(json["order_id"], 42);
        assert_eq!(json["order_status"], "CREATED");
        assert_eq!(json["progress"], "ORDER_ORDERED");
        assert!(json["dispatch_id"].is_null());
        assert!(json["delivery_id"].is_null());
        assert!(json["agent_id"].is_null());
    }

    #[test]
    fn test_parse_order_id_rejects_garbage() {
        assert_eq!(parse_order_id("42").unwrap(), OrderId::new(42));
        assert!(matches!(parse_order_id("abc"), Err(ApiError::BadRequest(_))));
    }
}
