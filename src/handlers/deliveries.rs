use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::DeliveryOutcome;
use crate::services::delivery_reconciler::ReconcileDelivery;
use crate::{errors::ServiceError, ApiResponse, AppState};

use super::orders::{map_order, OrderResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DriverConfirmationRequest {
    pub quantity_confirmed: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverConfirmationResponse {
    pub item_id: Uuid,
    pub quantity_dispatched: i32,
    /// Shortfall against the reviewed availability, for discrepancy
    /// follow-up.
    pub quantity_missing: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciliationResponse {
    pub order: OrderResponse,
    pub outcome: DeliveryOutcome,
    pub returns_created: usize,
    pub route_completed: bool,
}

/// Driver acknowledgment of the quantity loaded for one line
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items/{item_id}/driver-confirmation",
    summary = "Confirm quantities received by driver",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("item_id" = Uuid, Path, description = "Order item ID"),
    ),
    request_body = DriverConfirmationRequest,
    responses(
        (status = 200, description = "Quantities confirmed"),
        (status = 422, description = "Quantity out of range", body = crate::errors::ErrorResponse),
    ),
    tag = "Deliveries"
)]
pub async fn confirm_driver_quantities(
    State(state): State<AppState>,
    Path((_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<DriverConfirmationRequest>,
) -> Result<Json<ApiResponse<DriverConfirmationResponse>>, ServiceError> {
    let confirmation = state
        .services
        .quantity_ledger
        .confirm_received_by_driver(item_id, payload.quantity_confirmed)
        .await?;
    Ok(Json(ApiResponse::success(DriverConfirmationResponse {
        item_id: confirmation.item.id,
        quantity_dispatched: confirmation.item.quantity_dispatched,
        quantity_missing: confirmation.quantity_missing,
    })))
}

/// Settle an order's delivery against the driver's report
#[utoipa::path(
    post,
    path = "/api/v1/routes/{route_id}/orders/{order_id}/delivery",
    summary = "Reconcile delivery",
    params(
        ("route_id" = Uuid, Path, description = "Route ID"),
        ("order_id" = Uuid, Path, description = "Order ID"),
    ),
    request_body = ReconcileDelivery,
    responses(
        (status = 200, description = "Delivery reconciled"),
        (status = 422, description = "Missing evidence or return reason", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not in delivery", body = crate::errors::ErrorResponse),
    ),
    tag = "Deliveries"
)]
pub async fn reconcile_delivery(
    State(state): State<AppState>,
    Path((route_id, order_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReconcileDelivery>,
) -> Result<Json<ApiResponse<ReconciliationResponse>>, ServiceError> {
    let order = state.services.orders.get_order(order_id).await?;
    if order.assigned_route_id != Some(route_id) {
        return Err(ServiceError::ValidationError(format!(
            "Order {} is not on route {}",
            order.order_number, route_id
        )));
    }

    let result = state
        .services
        .delivery_reconciler
        .reconcile(order_id, payload)
        .await?;

    Ok(Json(ApiResponse::success(ReconciliationResponse {
        order: map_order(&result.order),
        outcome: result.outcome,
        returns_created: result.returns_created,
        route_completed: result.route_completed,
    })))
}
