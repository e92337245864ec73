use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fulfillment API",
        version = "0.3.0",
        description = r#"
# Fulfillment & Delivery Reconciliation API

Backend for food-distribution operations: order lifecycle, per-line quantity
ledger, route planning, delivery reconciliation with mandatory evidence, and
invoice/remision billing export.

## Error Handling

Errors use consistent JSON bodies with appropriate HTTP status codes:
conflicts (illegal transitions, double assignment, double invoicing,
concurrent reorders) map to 409; quantity violations and missing
evidence/reason to 422.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order lifecycle and review endpoints"),
        (name = "Routes", description = "Route planning and sequencing endpoints"),
        (name = "Deliveries", description = "Driver confirmation and reconciliation endpoints"),
        (name = "Billing", description = "Export and remision invoicing endpoints")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::advance_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::set_item_availability,

        // Routes
        crate::handlers::routes::create_route,
        crate::handlers::routes::list_routes,
        crate::handlers::routes::get_route,
        crate::handlers::routes::assign_orders,
        crate::handlers::routes::move_order,
        crate::handlers::routes::unassigned_orders,
        crate::handlers::routes::route_completion,

        // Deliveries
        crate::handlers::deliveries::confirm_driver_quantities,
        crate::handlers::deliveries::reconcile_delivery,

        // Billing
        crate::handlers::billing::generate_summary,
        crate::handlers::billing::execute_export,
        crate::handlers::billing::invoice_remisions,
        crate::handlers::billing::list_exports,
    ),
    components(schemas(
        crate::errors::ErrorResponse,

        // Domain enums
        crate::models::OrderStatus,
        crate::models::DeliveryOutcome,
        crate::models::AvailabilityStatus,
        crate::models::BillingType,
        crate::models::ReturnReason,
        crate::models::RouteStatus,
        crate::models::ExportCohort,

        // Order types
        crate::handlers::orders::OrderResponse,
        crate::handlers::orders::OrderItemResponse,
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::CreateOrderItemRequest,
        crate::handlers::orders::AdvanceOrderRequest,
        crate::handlers::orders::SetAvailabilityRequest,

        // Route types
        crate::handlers::routes::RouteResponse,
        crate::handlers::routes::RouteOrderResponse,
        crate::handlers::routes::CreateRouteRequest,
        crate::handlers::routes::AssignOrdersRequest,
        crate::handlers::routes::MoveOrderRequest,
        crate::services::route_planner::RouteCompletion,

        // Delivery types
        crate::handlers::deliveries::DriverConfirmationRequest,
        crate::handlers::deliveries::DriverConfirmationResponse,
        crate::handlers::deliveries::ReconciliationResponse,
        crate::services::delivery_reconciler::ReconcileDelivery,
        crate::services::delivery_reconciler::DeliveryLine,

        // Billing types
        crate::handlers::billing::SummaryRequest,
        crate::handlers::billing::ExportRequest,
        crate::handlers::billing::InvoiceRemisionsRequest,
        crate::services::billing_export::ExportSummary,
        crate::services::billing_export::CohortSummary,
        crate::services::billing_export::SummaryEntry,
    ))
)]
pub struct ApiDoc;

/// Swagger UI mounted the same way across environments.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
