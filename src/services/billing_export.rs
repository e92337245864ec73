use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction,
    EntityTrait, QueryFilter, TransactionError, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        client_entity::Entity as ClientEntity,
        export_batch_entity::{
            ActiveModel as BatchActiveModel, Entity as BatchEntity, Model as BatchModel,
        },
        number_sequence_entity::{self, INVOICE_NUMBERS},
        order_entity::{self, Entity as OrderEntity, Model as OrderModel},
        order_item_entity::{self, Entity as ItemEntity},
        route_entity::Entity as RouteEntity,
        route_order_entity::{self, Entity as RouteOrderEntity},
        BillingType, ExportCohort,
    },
};

lazy_static! {
    static ref EXPORTS_EXECUTED: IntCounter = IntCounter::new(
        "billing_exports_total",
        "Total number of billing export batches written"
    )
    .expect("metric can be created");
}

/// One order's contribution to an export, priced on delivered quantities.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SummaryEntry {
    pub order_id: Uuid,
    pub order_number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub billing_type: BillingType,
    pub amount: Decimal,
}

/// Orders of one billing cohort with their total.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CohortSummary {
    pub entries: Vec<SummaryEntry>,
    pub total_amount: Decimal,
}

/// Reconciled export preview across the selected routes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportSummary {
    pub route_ids: Vec<Uuid>,
    pub direct_billing: CohortSummary,
    pub remision: CohortSummary,
}

/// Batches written by one export run. Either side is absent when its
/// cohort had no orders.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub direct_billing: Option<BatchModel>,
    pub remision: Option<BatchModel>,
}

/// Batch billing export over one or more routes: partitions eligible
/// orders by the owning client's billing mode, invoices the direct cohort
/// with a contiguous number range, and remisions the rest for follow-up.
#[derive(Clone)]
pub struct BillingExportService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl BillingExportService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Splits priced entries into the two billing cohorts.
    pub fn partition(entries: Vec<SummaryEntry>) -> (CohortSummary, CohortSummary) {
        let mut direct = CohortSummary::default();
        let mut remision = CohortSummary::default();
        for entry in entries {
            let cohort = match entry.billing_type {
                BillingType::Facturable => &mut direct,
                BillingType::Remision => &mut remision,
            };
            cohort.total_amount += entry.amount;
            cohort.entries.push(entry);
        }
        (direct, remision)
    }

    /// Validates the route selection and prices every eligible order.
    ///
    /// Rejects empty routes, routes with nothing billable, and selections
    /// containing an already-invoiced order.
    async fn collect_entries(
        txn: &DatabaseTransaction,
        route_ids: &[Uuid],
    ) -> Result<Vec<SummaryEntry>, ServiceError> {
        if route_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "No routes selected for export".to_string(),
            ));
        }

        let mut entries = Vec::new();
        for route_id in route_ids {
            RouteEntity::find_by_id(*route_id)
                .one(txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Route {} not found", route_id)))?;

            let route_orders = RouteOrderEntity::find()
                .filter(route_order_entity::Column::RouteId.eq(*route_id))
                .all(txn)
                .await?;
            if route_orders.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "Route {} has no orders to export",
                    route_id
                )));
            }

            let order_ids: Vec<Uuid> = route_orders.iter().map(|ro| ro.order_id).collect();
            let orders = OrderEntity::find()
                .filter(order_entity::Column::Id.is_in(order_ids))
                .all(txn)
                .await?;

            let mut billable_on_route = 0usize;
            for order in orders {
                if order.is_invoiced {
                    return Err(ServiceError::AlreadyInvoiced(order.id));
                }
                if !order.status.is_billable() || order.is_invoiced_from_remision.is_some() {
                    continue;
                }
                billable_on_route += 1;
                entries.push(Self::price_order(txn, order).await?);
            }

            if billable_on_route == 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Route {} has no billable orders yet",
                    route_id
                )));
            }
        }

        Ok(entries)
    }

    async fn price_order(
        txn: &DatabaseTransaction,
        order: OrderModel,
    ) -> Result<SummaryEntry, ServiceError> {
        let client = ClientEntity::find_by_id(order.client_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Client {} not found", order.client_id))
            })?;

        let items = ItemEntity::find()
            .filter(order_item_entity::Column::OrderId.eq(order.id))
            .all(txn)
            .await?;
        let amount: Decimal = items.iter().map(|i| i.delivered_value()).sum();

        Ok(SummaryEntry {
            order_id: order.id,
            order_number: order.order_number,
            client_id: client.id,
            client_name: client.name,
            billing_type: client.billing_type,
            amount,
        })
    }

    /// Builds the export preview for the selected routes.
    #[instrument(skip(self), fields(routes = route_ids.len()))]
    pub async fn generate_summary(
        &self,
        route_ids: Vec<Uuid>,
    ) -> Result<ExportSummary, ServiceError> {
        let ids = route_ids.clone();
        let entries = self
            .db
            .transaction::<_, Vec<SummaryEntry>, ServiceError>(move |txn| {
                Box::pin(async move { Self::collect_entries(txn, &ids).await })
            })
            .await
            .map_err(flatten_txn_error)?;

        let (direct_billing, remision) = Self::partition(entries);
        Ok(ExportSummary {
            route_ids,
            direct_billing,
            remision,
        })
    }

    /// Runs the export: invoices the direct-billing cohort and remisions
    /// the rest.
    ///
    /// The two cohorts commit independently (they produce different
    /// artifacts), but each cohort is all-or-nothing: a claim race on any
    /// of its orders rolls the whole cohort back.
    #[instrument(skip(self), fields(user_id = %user_id, routes = route_ids.len()))]
    pub async fn execute_export(
        &self,
        user_id: Uuid,
        route_ids: Vec<Uuid>,
    ) -> Result<ExportResult, ServiceError> {
        let summary = self.generate_summary(route_ids.clone()).await?;

        let direct_batch = if summary.direct_billing.entries.is_empty() {
            None
        } else {
            Some(
                self.commit_direct_billing(user_id, &route_ids, summary.direct_billing)
                    .await?,
            )
        };

        let remision_batch = if summary.remision.entries.is_empty() {
            None
        } else {
            match self
                .commit_remisions(user_id, &route_ids, summary.remision)
                .await
            {
                Ok(batch) => Some(batch),
                Err(e) => {
                    // The invoice cohort already committed with its numbers
                    // allocated; surface the remision failure without
                    // pretending the whole run failed.
                    warn!("remision cohort failed after invoices committed: {}", e);
                    return Err(e);
                }
            }
        };

        Ok(ExportResult {
            direct_billing: direct_batch,
            remision: remision_batch,
        })
    }

    async fn commit_direct_billing(
        &self,
        user_id: Uuid,
        route_ids: &[Uuid],
        cohort: CohortSummary,
    ) -> Result<BatchModel, ServiceError> {
        let route_ids = route_ids.to_vec();
        let batch = self
            .db
            .transaction::<_, BatchModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let count = cohort.entries.len() as i64;
                    let start =
                        number_sequence_entity::allocate(txn, INVOICE_NUMBERS, count).await?;
                    let end = start + count - 1;

                    for entry in &cohort.entries {
                        Self::claim_invoice(txn, entry.order_id).await?;
                    }

                    let order_ids: Vec<Uuid> =
                        cohort.entries.iter().map(|e| e.order_id).collect();
                    let batch = BatchActiveModel {
                        id: Set(Uuid::new_v4()),
                        cohort: Set(ExportCohort::DirectBilling),
                        route_ids: Set(serde_json::json!(route_ids)),
                        order_ids: Set(serde_json::json!(order_ids)),
                        invoice_number_start: Set(Some(start)),
                        invoice_number_end: Set(Some(end)),
                        total_orders: Set(cohort.entries.len() as i32),
                        total_amount: Set(cohort.total_amount),
                        created_by: Set(user_id),
                        document_ref: Set(Some(format!("invoices/{:08}-{:08}.pdf", start, end))),
                        created_at: Set(Utc::now()),
                    };
                    Ok(batch.insert(txn).await?)
                })
            })
            .await
            .map_err(flatten_txn_error)?;

        info!(
            batch_id = %batch.id,
            invoice_start = ?batch.invoice_number_start,
            invoice_end = ?batch.invoice_number_end,
            "direct-billing batch written"
        );
        EXPORTS_EXECUTED.inc();
        self.event_sender
            .send(Event::ExportExecuted {
                batch_id: batch.id,
                total_orders: batch.total_orders,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(batch)
    }

    /// Claims one order for invoicing. The guard re-checks `is_invoiced`
    /// inside the claiming transaction so two concurrent exports cannot
    /// both take the same order.
    async fn claim_invoice(
        txn: &DatabaseTransaction,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = OrderEntity::update_many()
            .col_expr(order_entity::Column::IsInvoiced, Expr::value(true))
            .col_expr(order_entity::Column::InvoicedAt, Expr::value(Utc::now()))
            .col_expr(
                order_entity::Column::Version,
                Expr::col(order_entity::Column::Version).add(1),
            )
            .filter(order_entity::Column::Id.eq(order_id))
            .filter(order_entity::Column::IsInvoiced.eq(false))
            .exec(txn)
            .await?;

        if result.rows_affected != 1 {
            return Err(ServiceError::AlreadyInvoiced(order_id));
        }
        Ok(())
    }

    async fn commit_remisions(
        &self,
        user_id: Uuid,
        route_ids: &[Uuid],
        cohort: CohortSummary,
    ) -> Result<BatchModel, ServiceError> {
        let route_ids = route_ids.to_vec();
        let batch = self
            .db
            .transaction::<_, BatchModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    for entry in &cohort.entries {
                        // Remisioned orders stay un-invoiced; the marker
                        // parks them in the follow-up invoicing queue.
                        let result = OrderEntity::update_many()
                            .col_expr(
                                order_entity::Column::IsInvoicedFromRemision,
                                Expr::value(Some(false)),
                            )
                            .col_expr(
                                order_entity::Column::Version,
                                Expr::col(order_entity::Column::Version).add(1),
                            )
                            .filter(order_entity::Column::Id.eq(entry.order_id))
                            .filter(order_entity::Column::IsInvoiced.eq(false))
                            .filter(order_entity::Column::IsInvoicedFromRemision.is_null())
                            .exec(txn)
                            .await?;
                        if result.rows_affected != 1 {
                            return Err(ServiceError::AlreadyInvoiced(entry.order_id));
                        }
                    }

                    let order_ids: Vec<Uuid> =
                        cohort.entries.iter().map(|e| e.order_id).collect();
                    let batch_id = Uuid::new_v4();
                    let batch = BatchActiveModel {
                        id: Set(batch_id),
                        cohort: Set(ExportCohort::Remision),
                        route_ids: Set(serde_json::json!(route_ids)),
                        order_ids: Set(serde_json::json!(order_ids)),
                        invoice_number_start: Set(None),
                        invoice_number_end: Set(None),
                        total_orders: Set(cohort.entries.len() as i32),
                        total_amount: Set(cohort.total_amount),
                        created_by: Set(user_id),
                        document_ref: Set(Some(format!("remisions/{}.pdf", batch_id))),
                        created_at: Set(Utc::now()),
                    };
                    Ok(batch.insert(txn).await?)
                })
            })
            .await
            .map_err(flatten_txn_error)?;

        info!(batch_id = %batch.id, "remision batch written");
        EXPORTS_EXECUTED.inc();
        self.event_sender
            .send(Event::ExportExecuted {
                batch_id: batch.id,
                total_orders: batch.total_orders,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(batch)
    }

    /// Promotes previously remisioned orders to invoices, billed on the
    /// quantities that actually shipped.
    #[instrument(skip(self), fields(user_id = %user_id, orders = order_ids.len()))]
    pub async fn invoice_remisioned_orders(
        &self,
        user_id: Uuid,
        order_ids: Vec<Uuid>,
    ) -> Result<BatchModel, ServiceError> {
        if order_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "No orders selected for remision invoicing".to_string(),
            ));
        }

        let ids = order_ids.clone();
        let batch = self
            .db
            .transaction::<_, BatchModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut total_amount = Decimal::ZERO;
                    let mut route_ids: Vec<Uuid> = Vec::new();

                    for order_id in &ids {
                        let order = OrderEntity::find_by_id(*order_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Order {} not found", order_id))
                            })?;
                        if order.is_invoiced {
                            return Err(ServiceError::AlreadyInvoiced(*order_id));
                        }
                        if order.is_invoiced_from_remision != Some(false) {
                            return Err(ServiceError::ValidationError(format!(
                                "Order {} was never remisioned",
                                order.order_number
                            )));
                        }
                        if let Some(route_id) = order.assigned_route_id {
                            if !route_ids.contains(&route_id) {
                                route_ids.push(route_id);
                            }
                        }

                        let entry = Self::price_order(txn, order).await?;
                        total_amount += entry.amount;

                        let result = OrderEntity::update_many()
                            .col_expr(order_entity::Column::IsInvoiced, Expr::value(true))
                            .col_expr(
                                order_entity::Column::IsInvoicedFromRemision,
                                Expr::value(Some(true)),
                            )
                            .col_expr(order_entity::Column::InvoicedAt, Expr::value(Utc::now()))
                            .col_expr(
                                order_entity::Column::Version,
                                Expr::col(order_entity::Column::Version).add(1),
                            )
                            .filter(order_entity::Column::Id.eq(*order_id))
                            .filter(order_entity::Column::IsInvoiced.eq(false))
                            .exec(txn)
                            .await?;
                        if result.rows_affected != 1 {
                            return Err(ServiceError::AlreadyInvoiced(*order_id));
                        }
                    }

                    let count = ids.len() as i64;
                    let start =
                        number_sequence_entity::allocate(txn, INVOICE_NUMBERS, count).await?;
                    let end = start + count - 1;

                    let batch = BatchActiveModel {
                        id: Set(Uuid::new_v4()),
                        cohort: Set(ExportCohort::DirectBilling),
                        route_ids: Set(serde_json::json!(route_ids)),
                        order_ids: Set(serde_json::json!(ids)),
                        invoice_number_start: Set(Some(start)),
                        invoice_number_end: Set(Some(end)),
                        total_orders: Set(ids.len() as i32),
                        total_amount: Set(total_amount),
                        created_by: Set(user_id),
                        document_ref: Set(Some(format!(
                            "invoices/remision-follow-up-{:08}-{:08}.pdf",
                            start, end
                        ))),
                        created_at: Set(Utc::now()),
                    };
                    Ok(batch.insert(txn).await?)
                })
            })
            .await
            .map_err(flatten_txn_error)?;

        info!(batch_id = %batch.id, "remisioned orders invoiced");
        EXPORTS_EXECUTED.inc();
        for order_id in &order_ids {
            self.event_sender
                .send(Event::RemisionInvoiced {
                    order_id: *order_id,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }
        self.event_sender
            .send(Event::ExportExecuted {
                batch_id: batch.id,
                total_orders: batch.total_orders,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(batch)
    }

    /// Past export batches, newest first.
    pub async fn list_batches(&self) -> Result<Vec<BatchModel>, ServiceError> {
        use sea_orm::QueryOrder;
        Ok(BatchEntity::find()
            .order_by_desc(crate::models::export_batch_entity::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}

fn flatten_txn_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
