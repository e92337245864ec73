use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::billing_export::{ExportResult, ExportSummary};
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SummaryRequest {
    #[validate(length(min = 1))]
    pub route_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExportRequest {
    #[validate(length(min = 1))]
    pub route_ids: Vec<Uuid>,
    /// Staff member executing the export, stamped by the gateway.
    pub created_by: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InvoiceRemisionsRequest {
    #[validate(length(min = 1))]
    pub order_ids: Vec<Uuid>,
    pub created_by: Uuid,
}

/// Preview an export across the selected routes
#[utoipa::path(
    post,
    path = "/api/v1/billing/summary",
    summary = "Generate export summary",
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "Summary generated"),
        (status = 409, description = "Order already invoiced", body = crate::errors::ErrorResponse),
    ),
    tag = "Billing"
)]
pub async fn generate_summary(
    State(state): State<AppState>,
    Json(payload): Json<SummaryRequest>,
) -> Result<Json<ApiResponse<ExportSummary>>, ServiceError> {
    payload.validate()?;
    let summary = state
        .services
        .billing_export
        .generate_summary(payload.route_ids)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Execute the export for the selected routes
#[utoipa::path(
    post,
    path = "/api/v1/billing/export",
    summary = "Execute billing export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Export executed"),
        (status = 409, description = "Order claimed by another export", body = crate::errors::ErrorResponse),
    ),
    tag = "Billing"
)]
pub async fn execute_export(
    State(state): State<AppState>,
    Json(payload): Json<ExportRequest>,
) -> Result<Json<ApiResponse<ExportResult>>, ServiceError> {
    payload.validate()?;
    let result = state
        .services
        .billing_export
        .execute_export(payload.created_by, payload.route_ids)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Invoice previously remisioned orders
#[utoipa::path(
    post,
    path = "/api/v1/billing/invoice-remisions",
    summary = "Invoice remisioned orders",
    request_body = InvoiceRemisionsRequest,
    responses(
        (status = 200, description = "Remisions invoiced"),
        (status = 409, description = "Order already invoiced", body = crate::errors::ErrorResponse),
    ),
    tag = "Billing"
)]
pub async fn invoice_remisions(
    State(state): State<AppState>,
    Json(payload): Json<InvoiceRemisionsRequest>,
) -> Result<Json<ApiResponse<crate::models::export_batch_entity::Model>>, ServiceError> {
    payload.validate()?;
    let batch = state
        .services
        .billing_export
        .invoice_remisioned_orders(payload.created_by, payload.order_ids)
        .await?;
    Ok(Json(ApiResponse::success(batch)))
}

/// Past export batches, newest first
#[utoipa::path(
    get,
    path = "/api/v1/billing/exports",
    summary = "List export batches",
    responses((status = 200, description = "Batches retrieved")),
    tag = "Billing"
)]
pub async fn list_exports(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<crate::models::export_batch_entity::Model>>>, ServiceError> {
    let batches = state.services.billing_export.list_batches().await?;
    Ok(Json(ApiResponse::success(batches)))
}
