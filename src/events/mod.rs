use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{DeliveryOutcome, OrderStatus};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order lifecycle events
    OrderCreated(Uuid),
    OrderCancelled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },

    // Review events
    AvailabilityReviewed {
        order_id: Uuid,
        item_id: Uuid,
        quantity_available: i32,
    },

    // Route events
    OrderAssignedToRoute {
        order_id: Uuid,
        route_id: Uuid,
        delivery_sequence: i32,
    },
    RouteResequenced {
        route_id: Uuid,
    },
    RouteCompleted(Uuid),

    // Delivery events
    DriverConfirmedQuantities {
        order_id: Uuid,
        item_id: Uuid,
        quantity_missing: i32,
    },
    DeliveryReconciled {
        order_id: Uuid,
        route_id: Uuid,
        outcome: DeliveryOutcome,
    },
    ReturnCreated {
        order_id: Uuid,
        product_id: Uuid,
        quantity_returned: i32,
    },

    // Billing events
    ExportExecuted {
        batch_id: Uuid,
        total_orders: i32,
    },
    RemisionInvoiced {
        order_id: Uuid,
    },
}

/// Drains the event channel, logging each event. Downstream consumers
/// (notifications, exports to the reporting store) hook in here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::DeliveryReconciled {
                order_id,
                route_id,
                outcome,
            } => {
                info!(%order_id, %route_id, ?outcome, "delivery reconciled");
            }
            Event::ExportExecuted {
                batch_id,
                total_orders,
            } => {
                info!(%batch_id, total_orders, "billing export executed");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }

    warn!("Event channel closed; event processing loop stopped");
}
