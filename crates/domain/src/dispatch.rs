//! Dispatch source.

use chrono::{DateTime, Utc};
use common::{AgentId, DispatchId, Money, OrderId};
use events::{DispatchDispatched, DispatchRequested, EventPayload};
use outbox::PayloadGenerator;
use serde::{Deserialize, Serialize};

use crate::{DomainError, Result, missing_data};

/// The state of a dispatch.
///
/// State transitions:
/// ```text
/// Requested ──► Dispatched
///     │             │
///     └─────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    #[default]
    Requested,
    Dispatched,
    Cancelled,
}

impl DispatchStatus {
    pub fn can_dispatch(&self) -> bool {
        matches!(self, DispatchStatus::Requested)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, DispatchStatus::Requested | DispatchStatus::Dispatched)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Requested => "REQUESTED",
            DispatchStatus::Dispatched => "DISPATCHED",
            DispatchStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Snapshot of a dispatch after its latest mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    id: DispatchId,
    order_id: OrderId,
    status: DispatchStatus,
    agent_id: Option<AgentId>,
    delivery_fee: Option<Money>,
    requested_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl Dispatch {
    /// Opens a dispatch request for an order.
    pub fn request(id: DispatchId, order_id: OrderId, requested_at: DateTime<Utc>) -> Self {
        Self {
            id,
            order_id,
            status: DispatchStatus::Requested,
            agent_id: None,
            delivery_fee: None,
            requested_at,
            dispatched_at: None,
            cancelled_at: None,
        }
    }

    /// Records that `agent_id` accepted the dispatch at the suggested fee.
    pub fn dispatch(
        &mut self,
        agent_id: AgentId,
        delivery_fee: Money,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_dispatch() {
            return Err(self.invalid_transition("dispatch"));
        }
        self.status = DispatchStatus::Dispatched;
        self.agent_id = Some(agent_id);
        self.delivery_fee = Some(delivery_fee);
        self.dispatched_at = Some(at);
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_cancel() {
            return Err(self.invalid_transition("cancel"));
        }
        self.status = DispatchStatus::Cancelled;
        self.cancelled_at = Some(at);
        Ok(())
    }

    fn invalid_transition(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            aggregate: "dispatch",
            current_state: self.status.as_str(),
            action,
        }
    }

    pub fn id(&self) -> DispatchId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn agent_id(&self) -> Option<AgentId> {
        self.agent_id
    }

    pub fn delivery_fee(&self) -> Option<Money> {
        self.delivery_fee
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn dispatched_at(&self) -> Option<DateTime<Utc>> {
        self.dispatched_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }
}

/// Events emitted by the dispatch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchEventKind {
    Requested,
    Dispatched,
}

/// Renders dispatch events; the entity key is the dispatch id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchPayloadGenerator;

impl PayloadGenerator for DispatchPayloadGenerator {
    type Kind = DispatchEventKind;
    type Source = Dispatch;

    fn generate(&self, kind: DispatchEventKind, dispatch: &Dispatch) -> outbox::Result<EventPayload> {
        match kind {
            DispatchEventKind::Requested => Ok(EventPayload::DispatchRequested(DispatchRequested {
                dispatch_id: dispatch.id,
                order_id: dispatch.order_id,
                requested_at: dispatch.requested_at,
            })),
            DispatchEventKind::Dispatched => {
                let (Some(agent_id), Some(delivery_fee), Some(dispatched_at)) =
                    (dispatch.agent_id, dispatch.delivery_fee, dispatch.dispatched_at)
                else {
                    return Err(missing_data(kind, "dispatch has no assigned agent"));
                };
                Ok(EventPayload::DispatchDispatched(DispatchDispatched {
                    dispatch_id: dispatch.id,
                    order_id: dispatch.order_id,
                    agent_id,
                    delivery_fee,
                    dispatched_at,
                }))
            }
        }
    }

    fn entity_key(&self, dispatch: &Dispatch) -> String {
        dispatch.id.to_string()
    }
}
