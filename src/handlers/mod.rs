pub mod billing;
pub mod deliveries;
pub mod health;
pub mod orders;
pub mod routes;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    BillingExportService, DeliveryReconcilerService, OrderService, OrderStatusService,
    QuantityLedgerService, RoutePlannerService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub order_status: OrderStatusService,
    pub quantity_ledger: QuantityLedgerService,
    pub route_planner: RoutePlannerService,
    pub delivery_reconciler: DeliveryReconcilerService,
    pub billing_export: BillingExportService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let order_status = OrderStatusService::new(db.clone(), event_sender.clone());
        Self {
            orders: OrderService::new(db.clone(), event_sender.clone()),
            order_status: order_status.clone(),
            quantity_ledger: QuantityLedgerService::new(db.clone(), event_sender.clone()),
            route_planner: RoutePlannerService::new(db.clone(), event_sender.clone()),
            delivery_reconciler: DeliveryReconcilerService::new(
                db.clone(),
                event_sender.clone(),
                order_status,
            ),
            billing_export: BillingExportService::new(db, event_sender),
        }
    }
}
