use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        order_entity::Entity as OrderEntity,
        order_item_entity::{
            ActiveModel as ItemActiveModel, Entity as ItemEntity, Model as ItemModel,
        },
        AvailabilityStatus, OrderStatus,
    },
};

/// Sole mutator of the per-line quantity columns. Every other component
/// routes its quantity writes through here so the conservation invariants
/// are checked in exactly one place.
#[derive(Clone)]
pub struct QuantityLedgerService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

/// Result of a driver acknowledging what physically arrived on the vehicle.
#[derive(Debug, Clone)]
pub struct DriverConfirmation {
    pub item: ItemModel,
    /// Shortfall against the reviewed availability. Reported for
    /// discrepancy follow-up, never an error.
    pub quantity_missing: i32,
}

impl QuantityLedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Review-UI default for a partial line: half the ask, rounded down.
    pub fn default_partial_quantity(quantity_requested: i32) -> i32 {
        quantity_requested / 2
    }

    /// Resolves the availability quantity for a review verdict.
    ///
    /// `available` and `unavailable` ignore the supplied quantity and force
    /// the full/zero amount; `partial` requires an explicit in-range value.
    /// Re-selecting `pending` would un-review the line and is rejected.
    pub fn resolve_availability(
        status: AvailabilityStatus,
        quantity_requested: i32,
        supplied: Option<i32>,
    ) -> Result<i32, ServiceError> {
        match status {
            AvailabilityStatus::Available => Ok(quantity_requested),
            AvailabilityStatus::Unavailable => Ok(0),
            AvailabilityStatus::Partial => {
                let quantity = supplied.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Partial availability requires an explicit quantity".to_string(),
                    )
                })?;
                if quantity < 0 || quantity > quantity_requested {
                    return Err(ServiceError::OutOfRange(format!(
                        "Available quantity {} outside 0..={}",
                        quantity, quantity_requested
                    )));
                }
                Ok(quantity)
            }
            AvailabilityStatus::Pending => Err(ServiceError::ValidationError(
                "A reviewed line cannot be set back to pending".to_string(),
            )),
        }
    }

    /// Validates a delivery finalization against the item's ledger.
    ///
    /// The ceiling is the dispatched quantity; when the driver-confirmation
    /// step was skipped it falls back to the reviewed availability.
    pub fn validate_finalization(
        item: &ItemModel,
        delivered: i32,
        returned: i32,
    ) -> Result<(), ServiceError> {
        if delivered < 0 || returned < 0 {
            return Err(ServiceError::OutOfRange(format!(
                "Delivered ({}) and returned ({}) quantities must be non-negative",
                delivered, returned
            )));
        }
        let ceiling = item.delivery_ceiling();
        if delivered + returned > ceiling {
            return Err(ServiceError::OutOfRange(format!(
                "Delivered {} + returned {} exceeds the {} units on the vehicle for item {}",
                delivered, returned, ceiling, item.id
            )));
        }
        Ok(())
    }

    /// Records a review verdict for one line within `conn`.
    pub async fn apply_availability_on<C: ConnectionTrait>(
        conn: &C,
        item: ItemModel,
        status: AvailabilityStatus,
        supplied: Option<i32>,
    ) -> Result<ItemModel, ServiceError> {
        let quantity = Self::resolve_availability(status, item.quantity_requested, supplied)?;

        let mut active: ItemActiveModel = item.into();
        active.availability_status = Set(status);
        active.quantity_available = Set(quantity);
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }

    /// Persists final delivered/returned quantities for one line within
    /// `conn`. Callers hold the surrounding transaction.
    pub async fn apply_finalization_on<C: ConnectionTrait>(
        conn: &C,
        item: ItemModel,
        delivered: i32,
        returned: i32,
    ) -> Result<ItemModel, ServiceError> {
        Self::validate_finalization(&item, delivered, returned)?;

        let mut active: ItemActiveModel = item.into();
        active.quantity_delivered = Set(delivered);
        active.quantity_returned = Set(returned);
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }

    /// Records the reviewer's verdict for one order line.
    #[instrument(skip(self), fields(item_id = %item_id, status = %status))]
    pub async fn set_availability(
        &self,
        item_id: Uuid,
        status: AvailabilityStatus,
        quantity_available: Option<i32>,
    ) -> Result<ItemModel, ServiceError> {
        let txn = self.db.begin().await?;

        let item = ItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        let order = OrderEntity::find_by_id(item.order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", item.order_id)))?;

        if !order.status.is_under_review() {
            error!(
                "Availability edit rejected: order {} is {}",
                order.id, order.status
            );
            return Err(ServiceError::InvalidTransition(format!(
                "Availability can only be edited during review; order {} is {}",
                order.order_number, order.status
            )));
        }

        let updated = Self::apply_availability_on(&txn, item, status, quantity_available).await?;
        txn.commit().await?;

        info!(
            order_id = %order.id,
            quantity_available = updated.quantity_available,
            "availability recorded"
        );

        self.event_sender
            .send(Event::AvailabilityReviewed {
                order_id: order.id,
                item_id: updated.id,
                quantity_available: updated.quantity_available,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    /// Driver acknowledgment of the quantity physically loaded for one line.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn confirm_received_by_driver(
        &self,
        item_id: Uuid,
        quantity_confirmed: i32,
    ) -> Result<DriverConfirmation, ServiceError> {
        if quantity_confirmed < 0 {
            return Err(ServiceError::OutOfRange(format!(
                "Confirmed quantity must be non-negative, got {}",
                quantity_confirmed
            )));
        }

        let txn = self.db.begin().await?;

        let item = ItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        let order = OrderEntity::find_by_id(item.order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", item.order_id)))?;

        if !matches!(
            order.status,
            OrderStatus::Dispatched | OrderStatus::InDelivery
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "Driver confirmation requires a dispatched order; order {} is {}",
                order.order_number, order.status
            )));
        }

        if quantity_confirmed > item.quantity_available {
            // A surplus means the wrong crate was scanned, not a substitution.
            return Err(ServiceError::OutOfRange(format!(
                "Confirmed quantity {} exceeds the {} units reviewed as available",
                quantity_confirmed, item.quantity_available
            )));
        }

        let quantity_missing = item.quantity_available - quantity_confirmed;

        let mut active: ItemActiveModel = item.into();
        active.quantity_dispatched = Set(quantity_confirmed);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            order_id = %order.id,
            quantity_confirmed,
            quantity_missing,
            "driver confirmed quantities"
        );

        self.event_sender
            .send(Event::DriverConfirmedQuantities {
                order_id: order.id,
                item_id: updated.id,
                quantity_missing,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(DriverConfirmation {
            item: updated,
            quantity_missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item(requested: i32, available: i32, dispatched: i32) -> ItemModel {
        let now = Utc::now();
        ItemModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            line_number: 1,
            quantity_requested: requested,
            quantity_available: available,
            quantity_dispatched: dispatched,
            quantity_delivered: 0,
            quantity_returned: 0,
            availability_status: AvailabilityStatus::Available,
            unit_price: dec!(1200),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn available_forces_full_quantity() {
        let qty =
            QuantityLedgerService::resolve_availability(AvailabilityStatus::Available, 10, Some(3))
                .unwrap();
        assert_eq!(qty, 10);
    }

    #[test]
    fn unavailable_forces_zero() {
        let qty = QuantityLedgerService::resolve_availability(
            AvailabilityStatus::Unavailable,
            10,
            Some(7),
        )
        .unwrap();
        assert_eq!(qty, 0);
    }

    #[test]
    fn partial_requires_explicit_in_range_quantity() {
        assert_matches!(
            QuantityLedgerService::resolve_availability(AvailabilityStatus::Partial, 10, None),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            QuantityLedgerService::resolve_availability(AvailabilityStatus::Partial, 10, Some(11)),
            Err(ServiceError::OutOfRange(_))
        );
        assert_matches!(
            QuantityLedgerService::resolve_availability(AvailabilityStatus::Partial, 10, Some(-1)),
            Err(ServiceError::OutOfRange(_))
        );
        let qty =
            QuantityLedgerService::resolve_availability(AvailabilityStatus::Partial, 10, Some(4))
                .unwrap();
        assert_eq!(qty, 4);
    }

    #[test]
    fn pending_cannot_be_reselected() {
        assert_matches!(
            QuantityLedgerService::resolve_availability(AvailabilityStatus::Pending, 10, None),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn default_partial_rounds_down() {
        assert_eq!(QuantityLedgerService::default_partial_quantity(10), 5);
        assert_eq!(QuantityLedgerService::default_partial_quantity(5), 2);
        assert_eq!(QuantityLedgerService::default_partial_quantity(1), 0);
    }

    #[test]
    fn finalization_rejects_negative_inputs() {
        let it = item(10, 10, 10);
        assert_matches!(
            QuantityLedgerService::validate_finalization(&it, -1, 0),
            Err(ServiceError::OutOfRange(_))
        );
        assert_matches!(
            QuantityLedgerService::validate_finalization(&it, 0, -3),
            Err(ServiceError::OutOfRange(_))
        );
    }

    #[test]
    fn finalization_bounded_by_dispatched_quantity() {
        let it = item(10, 8, 6);
        assert!(QuantityLedgerService::validate_finalization(&it, 4, 2).is_ok());
        assert_matches!(
            QuantityLedgerService::validate_finalization(&it, 5, 2),
            Err(ServiceError::OutOfRange(_))
        );
    }

    #[test]
    fn finalization_falls_back_to_availability_when_dispatch_skipped() {
        let it = item(10, 8, 0);
        assert!(QuantityLedgerService::validate_finalization(&it, 8, 0).is_ok());
        assert_matches!(
            QuantityLedgerService::validate_finalization(&it, 9, 0),
            Err(ServiceError::OutOfRange(_))
        );
    }
}
