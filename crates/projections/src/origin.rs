//! Clients for the write-side services queried when the read model has nothing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AgentId, DeliveryId, DispatchId, Money, OrderId};
use events::{OrderItem, OrderLocation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::OriginError;

/// Response wrapper shared by the write-side services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T> OriginResponse<T> {
    /// The payload, if the call succeeded and carried one.
    pub fn into_data(self) -> Option<T> {
        if self.success { self.data } else { None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOrigin {
    pub order_id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub origin_location: Option<OrderLocation>,
    #[serde(default)]
    pub destination_location: Option<OrderLocation>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub ordered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOrigin {
    pub dispatch_id: DispatchId,
    pub order_id: OrderId,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub delivery_fee: Option<Money>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dispatched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOrigin {
    pub delivery_id: DeliveryId,
    pub order_id: OrderId,
    #[serde(default)]
    pub delivery_number: Option<String>,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub delivery_fee: Option<Money>,
    #[serde(default)]
    pub delivery_status: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub picked_up_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// The three write-side lookups used to rebuild a projection.
///
/// `Ok(None)` means the service answered but has no data for the order.
#[async_trait]
pub trait OriginServices: Send + Sync {
    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderOrigin>, OriginError>;

    async fn get_dispatch_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Option<DispatchOrigin>, OriginError>;

    async fn get_delivery_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Option<DeliveryOrigin>, OriginError>;
}

/// Base URLs of the write-side services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginEndpoints {
    pub order_url: String,
    pub dispatch_url: String,
    pub delivery_url: String,
}

/// [`OriginServices`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOriginServices {
    client: reqwest::Client,
    endpoints: OriginEndpoints,
}

impl HttpOriginServices {
    /// Creates a client whose requests give up after `request_timeout`.
    pub fn new(endpoints: OriginEndpoints, request_timeout: Duration) -> Result<Self, OriginError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, endpoints })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: String,
    ) -> Result<Option<T>, OriginError> {
        tracing::info!(service, %url, "querying origin service");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(OriginError::Status {
                service,
                status: status.as_u16(),
            });
        }

        let body: OriginResponse<T> = response.json().await?;
        Ok(body.into_data())
    }
}

#[async_trait]
impl OriginServices for HttpOriginServices {
    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderOrigin>, OriginError> {
        let url = format!("{}/api/v1/orders/{}", self.endpoints.order_url, order_id);
        self.get("order", url).await
    }

    async fn get_dispatch_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Option<DispatchOrigin>, OriginError> {
        let url = format!(
            "{}/api/v1/dispatches/order/{}",
            self.endpoints.dispatch_url, order_id
        );
        self.get("dispatch", url).await
    }

    async fn get_delivery_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Option<DeliveryOrigin>, OriginError> {
        let url = format!(
            "{}/api/v1/deliveries/order/{}",
            self.endpoints.delivery_url, order_id
        );
        self.get("delivery", url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsuccessful_response_has_no_data() {
        let response: OriginResponse<DispatchOrigin> = serde_json::from_value(serde_json::json!({
            "success": false,
            "data": {"dispatch_id": 1, "order_id": 2}
        }))
        .unwrap();
        assert!(response.into_data().is_none());
    }

    #[test]
    fn test_missing_data_is_none() {
        let response: OriginResponse<OrderOrigin> =
            serde_json::from_value(serde_json::json!({"success": true})).unwrap();
        assert!(response.into_data().is_none());
    }
}
