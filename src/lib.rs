//! Fulfillment API Library
//!
//! Order fulfillment and delivery-reconciliation engine for a
//! food-distribution operation: order lifecycle, per-line quantity ledger,
//! route planning, delivery reconciliation, and invoice/remision export.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::ToSchema;

use handlers::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()));
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

/// Standard envelope for all API responses.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            errors: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Common list-endpoint query parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

/// Builds the application router with every engine endpoint mounted.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        // Orders
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/advance", post(handlers::orders::advance_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route(
            "/orders/:id/items/:item_id/availability",
            put(handlers::orders::set_item_availability),
        )
        .route(
            "/orders/:id/items/:item_id/driver-confirmation",
            post(handlers::deliveries::confirm_driver_quantities),
        )
        // Routes
        .route(
            "/routes",
            post(handlers::routes::create_route).get(handlers::routes::list_routes),
        )
        .route(
            "/routes/unassigned-orders",
            get(handlers::routes::unassigned_orders),
        )
        .route("/routes/:id", get(handlers::routes::get_route))
        .route("/routes/:id/orders", post(handlers::routes::assign_orders))
        .route(
            "/routes/:id/orders/:order_id/move",
            post(handlers::routes::move_order),
        )
        .route(
            "/routes/:id/completion",
            get(handlers::routes::route_completion),
        )
        .route(
            "/routes/:id/orders/:order_id/delivery",
            post(handlers::deliveries::reconcile_delivery),
        )
        // Billing
        .route(
            "/billing/summary",
            post(handlers::billing::generate_summary),
        )
        .route("/billing/export", post(handlers::billing::execute_export))
        .route(
            "/billing/invoice-remisions",
            post(handlers::billing::invoice_remisions),
        )
        .route("/billing/exports", get(handlers::billing::list_exports));

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(openapi::swagger_ui())
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
