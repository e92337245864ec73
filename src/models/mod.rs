// Core domain models
pub mod order;
pub mod order_entity;
pub mod order_item_entity;

// Fulfillment and delivery models
pub mod route_entity;
pub mod route_order_entity;

// Reconciliation and billing models
pub mod client_entity;
pub mod export_batch_entity;
pub mod number_sequence_entity;
pub mod return_entity;

// Re-export commonly used types
pub use client_entity::BillingType;
pub use export_batch_entity::ExportCohort;
pub use order::{DeliveryOutcome, OrderEvent, OrderStatus};
pub use order_item_entity::AvailabilityStatus;
pub use return_entity::ReturnReason;
pub use route_entity::RouteStatus;
