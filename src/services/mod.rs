pub mod billing_export;
pub mod delivery_reconciler;
pub mod order_status;
pub mod orders;
pub mod quantity_ledger;
pub mod route_planner;

pub use billing_export::BillingExportService;
pub use delivery_reconciler::DeliveryReconcilerService;
pub use order_status::OrderStatusService;
pub use orders::OrderService;
pub use quantity_ledger::QuantityLedgerService;
pub use route_planner::RoutePlannerService;
