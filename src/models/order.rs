use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Enum representing the possible statuses of an order.
///
/// The lifecycle is linear up to delivery, then branches on the delivery
/// outcome. `Cancelled` is reachable from every non-terminal status and is
/// itself terminal.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "review_area1")]
    ReviewArea1,
    #[sea_orm(string_value = "review_area2")]
    ReviewArea2,
    #[sea_orm(string_value = "ready_dispatch")]
    ReadyDispatch,
    #[sea_orm(string_value = "dispatched")]
    Dispatched,
    #[sea_orm(string_value = "in_delivery")]
    InDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "partially_delivered")]
    PartiallyDelivered,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Outcome of a completed delivery, derived from the per-item quantities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    PartiallyDelivered,
    Returned,
}

impl DeliveryOutcome {
    pub fn as_status(self) -> OrderStatus {
        match self {
            DeliveryOutcome::Delivered => OrderStatus::Delivered,
            DeliveryOutcome::PartiallyDelivered => OrderStatus::PartiallyDelivered,
            DeliveryOutcome::Returned => OrderStatus::Returned,
        }
    }
}

/// Lifecycle events an order can be advanced with.
///
/// `DeliveryCompleted` carries the outcome derived by the delivery
/// reconciliation step; callers never pick a delivery-terminal status
/// directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "event", content = "outcome")]
pub enum OrderEvent {
    ReviewCompleted,
    DispatchConfirmed,
    SentToDriver,
    ReceivedByDriver,
    DeliveryCompleted(DeliveryOutcome),
    Cancel,
}

impl OrderStatus {
    /// Delivery-terminal statuses plus cancellation. No event is legal once
    /// an order is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::PartiallyDelivered
                | OrderStatus::Returned
                | OrderStatus::Cancelled
        )
    }

    /// Statuses in which line-item availability may still be edited.
    pub fn is_under_review(self) -> bool {
        matches!(
            self,
            OrderStatus::Received | OrderStatus::ReviewArea1 | OrderStatus::ReviewArea2
        )
    }

    /// Whether the order counts toward billing (invoice or remision).
    pub fn is_billable(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::PartiallyDelivered
        )
    }

    /// Validates a direct status change against the lifecycle adjacency.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        if target == OrderStatus::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (OrderStatus::Received, OrderStatus::ReviewArea1)
                | (OrderStatus::ReviewArea1, OrderStatus::ReviewArea2)
                | (OrderStatus::ReviewArea2, OrderStatus::ReadyDispatch)
                | (OrderStatus::ReadyDispatch, OrderStatus::Dispatched)
                | (OrderStatus::Dispatched, OrderStatus::InDelivery)
                | (OrderStatus::InDelivery, OrderStatus::Delivered)
                | (OrderStatus::InDelivery, OrderStatus::PartiallyDelivered)
                | (OrderStatus::InDelivery, OrderStatus::Returned)
        )
    }
}

impl OrderEvent {
    /// Resolves the target status for this event given the current one.
    ///
    /// Returns `None` when the event is not legal for the current status;
    /// the service layer turns that into an `InvalidTransition` error.
    pub fn target_status(self, current: OrderStatus) -> Option<OrderStatus> {
        let target = match (self, current) {
            (OrderEvent::ReviewCompleted, OrderStatus::Received) => OrderStatus::ReviewArea1,
            (OrderEvent::ReviewCompleted, OrderStatus::ReviewArea1) => OrderStatus::ReviewArea2,
            (OrderEvent::DispatchConfirmed, OrderStatus::ReviewArea2) => OrderStatus::ReadyDispatch,
            (OrderEvent::SentToDriver, OrderStatus::ReadyDispatch) => OrderStatus::Dispatched,
            (OrderEvent::ReceivedByDriver, OrderStatus::Dispatched) => OrderStatus::InDelivery,
            (OrderEvent::DeliveryCompleted(outcome), OrderStatus::InDelivery) => {
                outcome.as_status()
            }
            (OrderEvent::Cancel, current) if !current.is_terminal() => OrderStatus::Cancelled,
            _ => return None,
        };
        debug_assert!(current.can_transition_to(target));
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn happy_path_walks_every_stage() {
        let mut status = OrderStatus::Received;
        let events = [
            OrderEvent::ReviewCompleted,
            OrderEvent::ReviewCompleted,
            OrderEvent::DispatchConfirmed,
            OrderEvent::SentToDriver,
            OrderEvent::ReceivedByDriver,
            OrderEvent::DeliveryCompleted(DeliveryOutcome::Delivered),
        ];
        for event in events {
            status = event.target_status(status).expect("legal event");
        }
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn delivery_outcomes_only_reachable_from_in_delivery() {
        for status in OrderStatus::iter() {
            let legal = OrderEvent::DeliveryCompleted(DeliveryOutcome::PartiallyDelivered)
                .target_status(status)
                .is_some();
            assert_eq!(legal, status == OrderStatus::InDelivery);
        }
    }

    #[test]
    fn cancel_is_legal_everywhere_except_terminal_states() {
        for status in OrderStatus::iter() {
            let target = OrderEvent::Cancel.target_status(status);
            if status.is_terminal() {
                assert_eq!(target, None, "cancel should be rejected from {status}");
            } else {
                assert_eq!(target, Some(OrderStatus::Cancelled));
            }
        }
    }

    #[test]
    fn cancellation_cannot_be_reversed() {
        for status in OrderStatus::iter() {
            assert!(!OrderStatus::Cancelled.can_transition_to(status));
        }
    }

    #[test]
    fn no_event_skips_a_stage() {
        assert_eq!(
            OrderEvent::DispatchConfirmed.target_status(OrderStatus::Received),
            None
        );
        assert_eq!(
            OrderEvent::SentToDriver.target_status(OrderStatus::ReviewArea2),
            None
        );
        assert_eq!(
            OrderEvent::ReceivedByDriver.target_status(OrderStatus::ReadyDispatch),
            None
        );
    }

    #[test]
    fn terminal_statuses_accept_nothing() {
        let all_events = [
            OrderEvent::ReviewCompleted,
            OrderEvent::DispatchConfirmed,
            OrderEvent::SentToDriver,
            OrderEvent::ReceivedByDriver,
            OrderEvent::DeliveryCompleted(DeliveryOutcome::Returned),
            OrderEvent::Cancel,
        ];
        for status in OrderStatus::iter().filter(|s| s.is_terminal()) {
            for event in all_events {
                assert_eq!(event.target_status(status), None);
            }
        }
    }
}
