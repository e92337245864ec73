use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        number_sequence_entity::{self, ROUTE_NUMBERS},
        order_entity::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
        route_entity::{
            ActiveModel as RouteActiveModel, Entity as RouteEntity, Model as RouteModel,
        },
        route_order_entity::{
            self, ActiveModel as RouteOrderActiveModel, Entity as RouteOrderEntity,
            Model as RouteOrderModel,
        },
        OrderStatus, RouteStatus,
    },
};

/// Which way an order moves in the visiting sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Input payload for creating a route.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoute {
    #[validate(length(min = 1, max = 120))]
    pub route_name: String,
    pub route_date: NaiveDate,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
}

/// Derived delivery progress for a route. Never stored.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RouteCompletion {
    pub total_orders: u64,
    pub terminal_orders: u64,
    pub percent: f64,
}

/// Assigns dispatch-ready orders to routes and keeps each route's
/// delivery sequence a dense 1..N permutation.
#[derive(Clone)]
pub struct RoutePlannerService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl RoutePlannerService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// True when the sequence values form exactly 1..=N.
    pub fn is_dense_permutation(sequences: &[i32]) -> bool {
        let mut sorted: Vec<i32> = sequences.to_vec();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(i, s)| *s == i as i32 + 1)
    }

    /// Picks the neighbor to swap with, if any. `None` means a boundary
    /// no-op: the first order cannot move up, the last cannot move down.
    /// The slice must be ordered by `delivery_sequence`.
    pub fn plan_swap(
        ordered: &[RouteOrderModel],
        order_id: Uuid,
        direction: MoveDirection,
    ) -> Result<Option<(RouteOrderModel, RouteOrderModel)>, ServiceError> {
        let position = ordered
            .iter()
            .position(|ro| ro.order_id == order_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} is not on this route", order_id))
            })?;

        let neighbor = match direction {
            MoveDirection::Up => position.checked_sub(1),
            MoveDirection::Down => {
                if position + 1 < ordered.len() {
                    Some(position + 1)
                } else {
                    None
                }
            }
        };

        Ok(neighbor.map(|n| (ordered[position].clone(), ordered[n].clone())))
    }

    /// Creates a route in `planned`, numbering it from the shared counter.
    #[instrument(skip(self, input))]
    pub async fn create_route(&self, input: CreateRoute) -> Result<RouteModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let number = number_sequence_entity::allocate(&txn, ROUTE_NUMBERS, 1).await?;

        let now = Utc::now();
        let route = RouteActiveModel {
            id: Set(Uuid::new_v4()),
            route_number: Set(format!("RT-{:04}", number)),
            route_name: Set(input.route_name),
            route_date: Set(input.route_date),
            driver_id: Set(input.driver_id),
            vehicle_id: Set(input.vehicle_id),
            status: Set(RouteStatus::Planned),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = route.insert(&txn).await?;
        txn.commit().await?;

        info!(route_id = %saved.id, route_number = %saved.route_number, "route created");
        Ok(saved)
    }

    /// Assigns dispatch-ready orders to a route, appending each at the end
    /// of the current sequence. The whole batch is atomic: one ineligible
    /// order rolls everything back.
    #[instrument(skip(self), fields(route_id = %route_id, orders = order_ids.len()))]
    pub async fn assign(
        &self,
        route_id: Uuid,
        order_ids: Vec<Uuid>,
    ) -> Result<Vec<RouteOrderModel>, ServiceError> {
        if order_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "No orders supplied for assignment".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let route = RouteEntity::find_by_id(route_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Route {} not found", route_id)))?;
        if route.status == RouteStatus::Completed {
            return Err(ServiceError::InvalidTransition(format!(
                "Route {} is already completed",
                route.route_number
            )));
        }

        let mut next_sequence = RouteOrderEntity::find()
            .filter(route_order_entity::Column::RouteId.eq(route_id))
            .order_by_desc(route_order_entity::Column::DeliverySequence)
            .one(&txn)
            .await?
            .map(|ro| ro.delivery_sequence + 1)
            .unwrap_or(1);

        let mut assigned = Vec::with_capacity(order_ids.len());
        for order_id in &order_ids {
            let order = OrderEntity::find_by_id(*order_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

            if order.assigned_route_id.is_some() {
                return Err(ServiceError::AlreadyAssigned(*order_id));
            }
            if order.status != OrderStatus::ReadyDispatch {
                return Err(ServiceError::InvalidTransition(format!(
                    "Order {} is {} and cannot be routed",
                    order.order_number, order.status
                )));
            }

            let route_order = RouteOrderActiveModel {
                id: Set(Uuid::new_v4()),
                route_id: Set(route_id),
                order_id: Set(*order_id),
                delivery_sequence: Set(next_sequence),
                created_at: Set(Utc::now()),
            };
            let saved = route_order.insert(&txn).await?;

            let mut order_active: OrderActiveModel = order.into();
            order_active.assigned_route_id = Set(Some(route_id));
            order_active.updated_at = Set(Utc::now());
            order_active.update(&txn).await?;

            assigned.push(saved);
            next_sequence += 1;
        }

        txn.commit().await?;

        for ro in &assigned {
            self.event_sender
                .send(Event::OrderAssignedToRoute {
                    order_id: ro.order_id,
                    route_id,
                    delivery_sequence: ro.delivery_sequence,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(assigned)
    }

    /// Swaps an order with its neighbor in the visiting sequence.
    ///
    /// Both rows are rewritten inside one transaction, each update guarded
    /// by the sequence value read in the same transaction; a concurrent
    /// reorder that got there first turns up as `SequenceConflict` and
    /// nothing is written.
    #[instrument(skip(self), fields(route_id = %route_id, order_id = %order_id, direction = ?direction))]
    pub async fn reorder(
        &self,
        route_id: Uuid,
        order_id: Uuid,
        direction: MoveDirection,
    ) -> Result<Vec<RouteOrderModel>, ServiceError> {
        let txn = self.db.begin().await?;

        let ordered = Self::route_orders_on(&txn, route_id).await?;
        if ordered.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Route {} has no orders",
                route_id
            )));
        }

        let Some((moving, neighbor)) = Self::plan_swap(&ordered, order_id, direction)? else {
            // Boundary move: nothing to do.
            return Ok(ordered);
        };

        Self::guarded_sequence_write(&txn, &moving, neighbor.delivery_sequence).await?;
        Self::guarded_sequence_write(&txn, &neighbor, moving.delivery_sequence).await?;

        let resequenced = Self::route_orders_on(&txn, route_id).await?;
        debug_assert!(Self::is_dense_permutation(
            &resequenced
                .iter()
                .map(|ro| ro.delivery_sequence)
                .collect::<Vec<_>>()
        ));

        txn.commit().await?;

        self.event_sender
            .send(Event::RouteResequenced { route_id })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(resequenced)
    }

    /// Conditional update keyed on the sequence value we just read; zero
    /// rows affected means someone else moved the row first.
    async fn guarded_sequence_write(
        txn: &DatabaseTransaction,
        row: &RouteOrderModel,
        new_sequence: i32,
    ) -> Result<(), ServiceError> {
        let result = RouteOrderEntity::update_many()
            .col_expr(
                route_order_entity::Column::DeliverySequence,
                Expr::value(new_sequence),
            )
            .filter(route_order_entity::Column::Id.eq(row.id))
            .filter(route_order_entity::Column::DeliverySequence.eq(row.delivery_sequence))
            .exec(txn)
            .await?;

        if result.rows_affected != 1 {
            warn!(
                route_order_id = %row.id,
                "sequence changed under a concurrent reorder"
            );
            return Err(ServiceError::SequenceConflict(format!(
                "Route order {} moved concurrently",
                row.id
            )));
        }
        Ok(())
    }

    async fn route_orders_on(
        txn: &DatabaseTransaction,
        route_id: Uuid,
    ) -> Result<Vec<RouteOrderModel>, ServiceError> {
        Ok(RouteOrderEntity::find()
            .filter(route_order_entity::Column::RouteId.eq(route_id))
            .order_by_asc(route_order_entity::Column::DeliverySequence)
            .all(txn)
            .await?)
    }

    /// Orders ready for dispatch that no route has claimed yet.
    #[instrument(skip(self))]
    pub async fn unassigned_ready_orders(
        &self,
    ) -> Result<Vec<order_entity::Model>, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order_entity::Column::Status.eq(OrderStatus::ReadyDispatch))
            .filter(order_entity::Column::AssignedRouteId.is_null())
            .order_by_asc(order_entity::Column::ExpectedDeliveryDate)
            .all(&*self.db)
            .await?)
    }

    /// Gets a route with its orders in visiting sequence.
    pub async fn get_route_with_orders(
        &self,
        route_id: Uuid,
    ) -> Result<(RouteModel, Vec<RouteOrderModel>), ServiceError> {
        let route = RouteEntity::find_by_id(route_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Route {} not found", route_id)))?;

        let orders = RouteOrderEntity::find()
            .filter(route_order_entity::Column::RouteId.eq(route_id))
            .order_by_asc(route_order_entity::Column::DeliverySequence)
            .all(&*self.db)
            .await?;

        Ok((route, orders))
    }

    /// Lists routes, most recent date first.
    pub async fn list_routes(&self) -> Result<Vec<RouteModel>, ServiceError> {
        Ok(RouteEntity::find()
            .order_by_desc(crate::models::route_entity::Column::RouteDate)
            .all(&*self.db)
            .await?)
    }

    /// Delivery progress of a route as the ratio of terminal orders.
    #[instrument(skip(self), fields(route_id = %route_id))]
    pub async fn completion(&self, route_id: Uuid) -> Result<RouteCompletion, ServiceError> {
        let txn = self.db.begin().await?;
        let completion = Self::completion_on(&txn, route_id).await?;
        txn.commit().await?;
        Ok(completion)
    }

    pub(crate) async fn completion_on(
        txn: &DatabaseTransaction,
        route_id: Uuid,
    ) -> Result<RouteCompletion, ServiceError> {
        let route_orders = Self::route_orders_on(txn, route_id).await?;
        let total = route_orders.len() as u64;
        if total == 0 {
            return Ok(RouteCompletion {
                total_orders: 0,
                terminal_orders: 0,
                percent: 0.0,
            });
        }

        let order_ids: Vec<Uuid> = route_orders.iter().map(|ro| ro.order_id).collect();
        let orders = OrderEntity::find()
            .filter(order_entity::Column::Id.is_in(order_ids))
            .all(txn)
            .await?;
        let terminal = orders.iter().filter(|o| o.status.is_terminal()).count() as u64;

        Ok(RouteCompletion {
            total_orders: total,
            terminal_orders: terminal,
            percent: (terminal as f64 / total as f64) * 100.0,
        })
    }

    /// Flips the route to `completed` when every order on it is terminal.
    /// Returns whether the flip happened. Billing relies on this check, so
    /// completion is never set by hand.
    pub(crate) async fn mark_completed_if_done_on(
        txn: &DatabaseTransaction,
        route_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let route = RouteEntity::find_by_id(route_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Route {} not found", route_id)))?;
        if route.status == RouteStatus::Completed {
            return Ok(false);
        }

        let completion = Self::completion_on(txn, route_id).await?;
        if completion.total_orders == 0
            || completion.terminal_orders != completion.total_orders
        {
            return Ok(false);
        }

        let mut active: RouteActiveModel = route.into();
        active.status = Set(RouteStatus::Completed);
        active.updated_at = Set(Utc::now());
        active.update(txn).await?;
        Ok(true)
    }
}
