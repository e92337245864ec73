use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        order_entity::{
            ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        },
        order_item_entity::{self, Entity as ItemEntity, Model as ItemModel},
        return_entity::ActiveModel as ReturnActiveModel,
        route_entity::{ActiveModel as RouteActiveModel, Entity as RouteEntity},
        DeliveryOutcome, OrderEvent, OrderStatus, ReturnReason, RouteStatus,
    },
    services::{
        order_status::OrderStatusService, quantity_ledger::QuantityLedgerService,
        route_planner::RoutePlannerService,
    },
};

lazy_static! {
    static ref DELIVERIES_RECONCILED: IntCounter = IntCounter::new(
        "deliveries_reconciled_total",
        "Total number of order deliveries reconciled"
    )
    .expect("metric can be created");
}

/// Final quantities a driver reports for one line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryLine {
    pub item_id: Uuid,
    pub delivered_quantity: i32,
    pub returned_quantity: i32,
}

/// Driver-submitted outcome for one order on a route.
///
/// A single return reason covers every rejected line of the delivery
/// event; drivers report one refusal conversation, not one per crate.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReconcileDelivery {
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<DeliveryLine>,
    /// Reference to the delivery evidence (photo, signature scan).
    pub evidence_ref: Option<String>,
    pub return_reason: Option<ReturnReason>,
    pub reason_note: Option<String>,
}

/// Result of one reconciliation.
#[derive(Debug, Clone)]
pub struct ReconciliationResult {
    pub order: OrderModel,
    pub outcome: DeliveryOutcome,
    pub returns_created: usize,
    pub route_completed: bool,
}

/// Consumes driver-submitted outcomes, settles the ledger, derives the
/// order's terminal status, and spawns return records. One transaction per
/// order: a failed validation leaves every row untouched.
#[derive(Clone)]
pub struct DeliveryReconcilerService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    order_status: OrderStatusService,
}

impl DeliveryReconcilerService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        order_status: OrderStatusService,
    ) -> Self {
        Self {
            db,
            event_sender,
            order_status,
        }
    }

    /// Derives the order-level outcome from the finalized lines.
    ///
    /// Everything the review promised arrived untouched: `delivered`.
    /// Nothing at all was handed over: `returned`. Anything in between is
    /// a partial delivery.
    pub fn derive_outcome(items: &[ItemModel]) -> DeliveryOutcome {
        if items.iter().all(|i| i.is_fully_delivered()) {
            DeliveryOutcome::Delivered
        } else if items.iter().all(|i| i.quantity_delivered == 0) {
            DeliveryOutcome::Returned
        } else {
            DeliveryOutcome::PartiallyDelivered
        }
    }

    /// Settles one order's delivery against the driver's report.
    #[instrument(skip(self, input), fields(order_id = %order_id, lines = input.lines.len()))]
    pub async fn reconcile(
        &self,
        order_id: Uuid,
        input: ReconcileDelivery,
    ) -> Result<ReconciliationResult, ServiceError> {
        input.validate()?;

        // Evidence and reason are hard preconditions, checked before any
        // write so a rejected submission proves zero mutations.
        let evidence_ref = input
            .evidence_ref
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ServiceError::MissingEvidence)?
            .to_string();

        let any_returns = input.lines.iter().any(|l| l.returned_quantity > 0);
        if any_returns && input.return_reason.is_none() {
            return Err(ServiceError::MissingReturnReason);
        }

        let order_status = self.order_status.clone();
        let lines = input.lines.clone();
        let return_reason = input.return_reason;
        let reason_note = input.reason_note.clone();
        let evidence = evidence_ref.clone();

        let (result, old_status, route_id) = self
            .db
            .transaction::<_, (ReconciliationResult, OrderStatus, Uuid), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let order = OrderEntity::find_by_id(order_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Order {} not found", order_id))
                            })?;

                        if order.status != OrderStatus::InDelivery {
                            return Err(ServiceError::InvalidTransition(format!(
                                "Order {} is {} and cannot be reconciled",
                                order.order_number, order.status
                            )));
                        }

                        let route_id = order.assigned_route_id.ok_or_else(|| {
                            ServiceError::ValidationError(format!(
                                "Order {} is not assigned to a route",
                                order.order_number
                            ))
                        })?;

                        let items = ItemEntity::find()
                            .filter(order_item_entity::Column::OrderId.eq(order_id))
                            .all(txn)
                            .await?;

                        let mut by_item: HashMap<Uuid, &DeliveryLine> = HashMap::new();
                        for line in &lines {
                            if by_item.insert(line.item_id, line).is_some() {
                                return Err(ServiceError::ValidationError(format!(
                                    "Item {} reported twice",
                                    line.item_id
                                )));
                            }
                        }
                        if by_item.len() != items.len() {
                            return Err(ServiceError::ValidationError(format!(
                                "Delivery must cover all {} line(s) of the order",
                                items.len()
                            )));
                        }

                        let mut finalized = Vec::with_capacity(items.len());
                        for item in items {
                            let line = by_item.remove(&item.id).ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Item {} does not belong to order {}",
                                    item.id, order_id
                                ))
                            })?;
                            let updated = QuantityLedgerService::apply_finalization_on(
                                txn,
                                item,
                                line.delivered_quantity,
                                line.returned_quantity,
                            )
                            .await?;
                            finalized.push(updated);
                        }

                        let outcome = Self::derive_outcome(&finalized);
                        let (old_status, order) = order_status
                            .advance_on(txn, order_id, OrderEvent::DeliveryCompleted(outcome))
                            .await?;

                        let mut order_active: OrderActiveModel = order.into();
                        order_active.delivery_evidence_ref = Set(Some(evidence));
                        let order = order_active.update(txn).await?;

                        let mut returns_created = 0;
                        for item in finalized.iter().filter(|i| i.quantity_returned > 0) {
                            let reason = return_reason.unwrap_or(ReturnReason::Other);
                            let record = ReturnActiveModel {
                                id: Set(Uuid::new_v4()),
                                order_id: Set(order_id),
                                product_id: Set(item.product_id),
                                quantity_returned: Set(item.quantity_returned),
                                reason: Set(reason),
                                reason_note: Set(reason_note.clone()),
                                route_id: Set(route_id),
                                created_at: Set(Utc::now()),
                            };
                            record.insert(txn).await?;
                            returns_created += 1;
                        }

                        // First settled delivery moves a planned route into
                        // progress; the last one completes it.
                        let route = RouteEntity::find_by_id(route_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!("Route {} not found", route_id))
                            })?;
                        if route.status == RouteStatus::Planned {
                            let mut active: RouteActiveModel = route.into();
                            active.status = Set(RouteStatus::InProgress);
                            active.updated_at = Set(Utc::now());
                            active.update(txn).await?;
                        }
                        let route_completed =
                            RoutePlannerService::mark_completed_if_done_on(txn, route_id).await?;

                        Ok((
                            ReconciliationResult {
                                order,
                                outcome,
                                returns_created,
                                route_completed,
                            },
                            old_status,
                            route_id,
                        ))
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            order_id = %result.order.id,
            outcome = ?result.outcome,
            returns_created = result.returns_created,
            evidence_ref = %evidence_ref,
            "delivery reconciled"
        );
        DELIVERIES_RECONCILED.inc();

        self.event_sender
            .send(Event::OrderStatusChanged {
                order_id: result.order.id,
                old_status,
                new_status: result.order.status,
            })
            .await
            .map_err(ServiceError::EventError)?;
        self.event_sender
            .send(Event::DeliveryReconciled {
                order_id: result.order.id,
                route_id,
                outcome: result.outcome,
            })
            .await
            .map_err(ServiceError::EventError)?;
        if result.route_completed {
            self.event_sender
                .send(Event::RouteCompleted(route_id))
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(result)
    }
}
