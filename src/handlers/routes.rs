use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{route_entity, route_order_entity, RouteStatus};
use crate::services::route_planner::{CreateRoute, MoveDirection, RouteCompletion};
use crate::{errors::ServiceError, ApiResponse, AppState};

use super::orders::{map_order, OrderResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteResponse {
    pub id: Uuid,
    pub route_number: String,
    pub route_name: String,
    pub route_date: NaiveDate,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: RouteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<RouteOrderResponse>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteOrderResponse {
    pub order_id: Uuid,
    pub delivery_sequence: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, max = 120))]
    pub route_name: String,
    pub route_date: NaiveDate,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignOrdersRequest {
    #[validate(length(min = 1))]
    pub order_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveOrderRequest {
    pub direction: MoveDirection,
}

fn map_route(route: &route_entity::Model) -> RouteResponse {
    RouteResponse {
        id: route.id,
        route_number: route.route_number.clone(),
        route_name: route.route_name.clone(),
        route_date: route.route_date,
        driver_id: route.driver_id,
        vehicle_id: route.vehicle_id,
        status: route.status,
        orders: None,
    }
}

fn map_route_order(ro: &route_order_entity::Model) -> RouteOrderResponse {
    RouteOrderResponse {
        order_id: ro.order_id,
        delivery_sequence: ro.delivery_sequence,
    }
}

/// Create a route
#[utoipa::path(
    post,
    path = "/api/v1/routes",
    summary = "Create route",
    request_body = CreateRouteRequest,
    responses((status = 201, description = "Route created")),
    tag = "Routes"
)]
pub async fn create_route(
    State(state): State<AppState>,
    Json(payload): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RouteResponse>>), ServiceError> {
    payload.validate()?;
    let route = state
        .services
        .route_planner
        .create_route(CreateRoute {
            route_name: payload.route_name,
            route_date: payload.route_date,
            driver_id: payload.driver_id,
            vehicle_id: payload.vehicle_id,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_route(&route))),
    ))
}

/// List routes
#[utoipa::path(
    get,
    path = "/api/v1/routes",
    summary = "List routes",
    responses((status = 200, description = "Routes retrieved")),
    tag = "Routes"
)]
pub async fn list_routes(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RouteResponse>>>, ServiceError> {
    let routes = state.services.route_planner.list_routes().await?;
    Ok(Json(ApiResponse::success(
        routes.iter().map(map_route).collect(),
    )))
}

/// Get a route with its orders in visiting sequence
#[utoipa::path(
    get,
    path = "/api/v1/routes/{id}",
    summary = "Get route",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Route retrieved"),
        (status = 404, description = "Route not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Routes"
)]
pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RouteResponse>>, ServiceError> {
    let (route, route_orders) = state.services.route_planner.get_route_with_orders(id).await?;
    let mut response = map_route(&route);
    response.orders = Some(route_orders.iter().map(map_route_order).collect());
    Ok(Json(ApiResponse::success(response)))
}

/// Assign dispatch-ready orders to a route
#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/orders",
    summary = "Assign orders to route",
    params(("id" = Uuid, Path, description = "Route ID")),
    request_body = AssignOrdersRequest,
    responses(
        (status = 200, description = "Orders assigned"),
        (status = 409, description = "Order already routed", body = crate::errors::ErrorResponse),
    ),
    tag = "Routes"
)]
pub async fn assign_orders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignOrdersRequest>,
) -> Result<Json<ApiResponse<Vec<RouteOrderResponse>>>, ServiceError> {
    payload.validate()?;
    let assigned = state
        .services
        .route_planner
        .assign(id, payload.order_ids)
        .await?;
    Ok(Json(ApiResponse::success(
        assigned.iter().map(map_route_order).collect(),
    )))
}

/// Move an order one position up or down in the visiting sequence
#[utoipa::path(
    post,
    path = "/api/v1/routes/{id}/orders/{order_id}/move",
    summary = "Reorder route",
    params(
        ("id" = Uuid, Path, description = "Route ID"),
        ("order_id" = Uuid, Path, description = "Order ID"),
    ),
    request_body = MoveOrderRequest,
    responses(
        (status = 200, description = "Sequence updated"),
        (status = 409, description = "Concurrent reorder detected", body = crate::errors::ErrorResponse),
    ),
    tag = "Routes"
)]
pub async fn move_order(
    State(state): State<AppState>,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MoveOrderRequest>,
) -> Result<Json<ApiResponse<Vec<RouteOrderResponse>>>, ServiceError> {
    let resequenced = state
        .services
        .route_planner
        .reorder(id, order_id, payload.direction)
        .await?;
    Ok(Json(ApiResponse::success(
        resequenced.iter().map(map_route_order).collect(),
    )))
}

/// Orders ready for dispatch with no route yet
#[utoipa::path(
    get,
    path = "/api/v1/routes/unassigned-orders",
    summary = "List unassigned ready orders",
    responses((status = 200, description = "Orders retrieved")),
    tag = "Routes"
)]
pub async fn unassigned_orders(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let orders = state.services.route_planner.unassigned_ready_orders().await?;
    Ok(Json(ApiResponse::success(
        orders.iter().map(map_order).collect(),
    )))
}

/// Derived delivery progress for a route
#[utoipa::path(
    get,
    path = "/api/v1/routes/{id}/completion",
    summary = "Route completion",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses((status = 200, description = "Completion computed")),
    tag = "Routes"
)]
pub async fn route_completion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RouteCompletion>>, ServiceError> {
    let completion = state.services.route_planner.completion(id).await?;
    Ok(Json(ApiResponse::success(completion)))
}
