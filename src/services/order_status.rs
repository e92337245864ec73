use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        order_entity::{
            ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        },
        order_item_entity::{Column as ItemColumn, Entity as ItemEntity},
        AvailabilityStatus, OrderEvent, OrderStatus,
    },
};

/// Drives the order lifecycle. All status writes go through `advance`; the
/// target state is derived from the event, never chosen by callers.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Advances an order with a lifecycle event, validating the transition
    /// and the dispatch-readiness gate inside one transaction.
    #[instrument(skip(self), fields(order_id = %order_id, event = ?event))]
    pub async fn advance(
        &self,
        order_id: Uuid,
        event: OrderEvent,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;
        let (old_status, updated) = self.advance_on(&txn, order_id, event).await?;
        txn.commit().await?;

        let notification = if updated.status == OrderStatus::Cancelled {
            Event::OrderCancelled(updated.id)
        } else {
            Event::OrderStatusChanged {
                order_id: updated.id,
                old_status,
                new_status: updated.status,
            }
        };
        self.event_sender
            .send(notification)
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    /// Transaction-scoped variant used by collaborators that advance the
    /// order as part of a larger atomic operation (delivery
    /// reconciliation). Emits nothing; the caller owns the commit and the
    /// notification.
    pub async fn advance_on(
        &self,
        txn: &DatabaseTransaction,
        order_id: Uuid,
        event: OrderEvent,
    ) -> Result<(OrderStatus, OrderModel), ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        let new_status = event.target_status(old_status).ok_or_else(|| {
            error!(
                "Invalid lifecycle event {:?} for order {} in {}",
                event, order.order_number, old_status
            );
            ServiceError::InvalidTransition(format!(
                "Event {:?} is not legal for an order in {}",
                event, old_status
            ))
        })?;

        if new_status == OrderStatus::ReadyDispatch {
            Self::ensure_fully_reviewed(txn, &order).await?;
        }

        let mut active: OrderActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let updated = active.update(txn).await?;

        info!(
            "Order {} status updated from '{}' to '{}'",
            order_id, old_status, new_status
        );

        Ok((old_status, updated))
    }

    /// An order becomes dispatch-ready only once every line has a
    /// non-pending availability verdict.
    async fn ensure_fully_reviewed(
        txn: &DatabaseTransaction,
        order: &OrderModel,
    ) -> Result<(), ServiceError> {
        let pending = ItemEntity::find()
            .filter(ItemColumn::OrderId.eq(order.id))
            .filter(ItemColumn::AvailabilityStatus.eq(AvailabilityStatus::Pending))
            .count(txn)
            .await?;

        if pending > 0 {
            return Err(ServiceError::InvalidTransition(format!(
                "Order {} has {} line(s) awaiting review",
                order.order_number, pending
            )));
        }
        Ok(())
    }

    /// Gets the current status of an order
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_status(&self, order_id: Uuid) -> Result<OrderStatus, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(order.status)
    }
}
