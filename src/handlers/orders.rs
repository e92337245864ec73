use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{order_entity, order_item_entity, AvailabilityStatus, OrderEvent, OrderStatus};
use crate::services::orders::{CreateOrder, CreateOrderItem};
use crate::{errors::ServiceError, ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub client_id: Uuid,
    pub branch_id: Uuid,
    pub status: OrderStatus,
    pub expected_delivery_date: NaiveDate,
    pub requested_delivery_date: NaiveDate,
    pub total_value: Decimal,
    pub is_invoiced: bool,
    pub is_invoiced_from_remision: Option<bool>,
    pub invoiced_at: Option<DateTime<Utc>>,
    pub assigned_route_id: Option<Uuid>,
    pub observations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItemResponse>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub line_number: i32,
    pub quantity_requested: i32,
    pub quantity_available: i32,
    pub quantity_dispatched: i32,
    pub quantity_delivered: i32,
    pub quantity_returned: i32,
    pub availability_status: AvailabilityStatus,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub client_id: Uuid,
    pub branch_id: Uuid,
    pub expected_delivery_date: NaiveDate,
    pub requested_delivery_date: NaiveDate,
    #[validate(length(min = 1))]
    pub items: Vec<CreateOrderItemRequest>,
    pub observations: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity_requested: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceOrderRequest {
    /// One of: review_completed, dispatch_confirmed, sent_to_driver,
    /// received_by_driver. Delivery-terminal transitions are driven by the
    /// reconciliation endpoint, not by callers.
    pub event: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetAvailabilityRequest {
    pub availability_status: AvailabilityStatus,
    pub quantity_available: Option<i32>,
}

pub fn map_order(order: &order_entity::Model) -> OrderResponse {
    OrderResponse {
        id: order.id,
        order_number: order.order_number.clone(),
        client_id: order.client_id,
        branch_id: order.branch_id,
        status: order.status,
        expected_delivery_date: order.expected_delivery_date,
        requested_delivery_date: order.requested_delivery_date,
        total_value: order.total_value,
        is_invoiced: order.is_invoiced,
        is_invoiced_from_remision: order.is_invoiced_from_remision,
        invoiced_at: order.invoiced_at,
        assigned_route_id: order.assigned_route_id,
        observations: order.observations.clone(),
        items: None,
    }
}

fn map_order_item(item: &order_item_entity::Model) -> OrderItemResponse {
    OrderItemResponse {
        id: item.id,
        product_id: item.product_id,
        line_number: item.line_number,
        quantity_requested: item.quantity_requested,
        quantity_available: item.quantity_available,
        quantity_dispatched: item.quantity_dispatched,
        quantity_delivered: item.quantity_delivered,
        quantity_returned: item.quantity_returned,
        availability_status: item.availability_status,
        unit_price: item.unit_price,
    }
}

fn map_event_str(event: &str) -> Result<OrderEvent, ServiceError> {
    match event {
        "review_completed" => Ok(OrderEvent::ReviewCompleted),
        "dispatch_confirmed" => Ok(OrderEvent::DispatchConfirmed),
        "sent_to_driver" => Ok(OrderEvent::SentToDriver),
        "received_by_driver" => Ok(OrderEvent::ReceivedByDriver),
        "cancel" => Ok(OrderEvent::Cancel),
        "delivery_completed" => Err(ServiceError::ValidationError(
            "Delivery completion is derived by the reconciliation endpoint".to_string(),
        )),
        other => Err(ServiceError::ValidationError(format!(
            "Unknown lifecycle event: {other}"
        ))),
    }
}

fn map_status_str(status: &str) -> Result<OrderStatus, ServiceError> {
    match status {
        "received" => Ok(OrderStatus::Received),
        "review_area1" => Ok(OrderStatus::ReviewArea1),
        "review_area2" => Ok(OrderStatus::ReviewArea2),
        "ready_dispatch" => Ok(OrderStatus::ReadyDispatch),
        "dispatched" => Ok(OrderStatus::Dispatched),
        "in_delivery" => Ok(OrderStatus::InDelivery),
        "delivered" => Ok(OrderStatus::Delivered),
        "partially_delivered" => Ok(OrderStatus::PartiallyDelivered),
        "returned" => Ok(OrderStatus::Returned),
        "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
        other => Err(ServiceError::ValidationError(format!(
            "Unknown order status: {other}"
        ))),
    }
}

/// Create a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created"),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    payload.validate()?;

    let input = CreateOrder {
        client_id: payload.client_id,
        branch_id: payload.branch_id,
        expected_delivery_date: payload.expected_delivery_date,
        requested_delivery_date: payload.requested_delivery_date,
        items: payload
            .items
            .iter()
            .map(|i| CreateOrderItem {
                product_id: i.product_id,
                quantity_requested: i.quantity_requested,
                unit_price: i.unit_price,
            })
            .collect(),
        observations: payload.observations,
    };

    let order = state.services.orders.create_order(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_order(&order))),
    ))
}

/// List orders with pagination and optional status filter
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Orders retrieved"),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderResponse>>>, ServiceError> {
    let status = query.status.as_deref().map(map_status_str).transpose()?;
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let (orders, total) = state.services.orders.list_orders(status, page, limit).await?;
    let items: Vec<OrderResponse> = orders.iter().map(map_order).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}

/// Get an order with its line items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let (order, items) = state.services.orders.get_order_with_items(id).await?;
    let mut response = map_order(&order);
    response.items = Some(items.iter().map(map_order_item).collect());
    Ok(Json(ApiResponse::success(response)))
}

/// Advance an order through its lifecycle
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/advance",
    summary = "Advance order lifecycle",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AdvanceOrderRequest,
    responses(
        (status = 200, description = "Order advanced"),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn advance_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let event = map_event_str(&payload.event)?;
    let order = state.services.order_status.advance(id, event).await?;
    Ok(Json(ApiResponse::success(map_order(&order))))
}

/// Cancel an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    summary = "Cancel order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled"),
        (status = 409, description = "Order already terminal", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state
        .services
        .order_status
        .advance(id, OrderEvent::Cancel)
        .await?;
    Ok(Json(ApiResponse::success(map_order(&order))))
}

/// Record the review verdict for one order line
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/items/{item_id}/availability",
    summary = "Set line availability",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("item_id" = Uuid, Path, description = "Order item ID"),
    ),
    request_body = SetAvailabilityRequest,
    responses(
        (status = 200, description = "Availability recorded"),
        (status = 422, description = "Quantity out of range", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn set_item_availability(
    State(state): State<AppState>,
    Path((_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SetAvailabilityRequest>,
) -> Result<Json<ApiResponse<OrderItemResponse>>, ServiceError> {
    let item = state
        .services
        .quantity_ledger
        .set_availability(item_id, payload.availability_status, payload.quantity_available)
        .await?;
    Ok(Json(ApiResponse::success(map_order_item(&item))))
}
