use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Review verdict for one order line.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AvailabilityStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "unavailable")]
    Unavailable,
}

/// Order Item entity model.
///
/// Quantity columns form the per-line ledger: requested at creation,
/// available after review, dispatched at driver confirmation, and
/// delivered/returned at reconciliation. Only the quantity ledger service
/// writes these columns.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub order_id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub product_id: Uuid,

    /// 1-based position of the line within its order.
    pub line_number: i32,

    #[validate(range(min = 1))]
    pub quantity_requested: i32,

    pub quantity_available: i32,

    pub quantity_dispatched: i32,

    pub quantity_delivered: i32,

    pub quantity_returned: i32,

    pub availability_status: AvailabilityStatus,

    pub unit_price: Decimal,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::models::order_entity::Entity",
        from = "Column::OrderId",
        to = "crate::models::order_entity::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<crate::models::order_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Quantity ceiling for delivery finalization. Falls back to the
    /// reviewed availability when the driver confirmation step was skipped.
    pub fn delivery_ceiling(&self) -> i32 {
        if self.quantity_dispatched > 0 {
            self.quantity_dispatched
        } else {
            self.quantity_available
        }
    }

    /// Amount billed for this line: what actually shipped, not what was
    /// asked for.
    pub fn delivered_value(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity_delivered)
    }

    /// Fully delivered means the client got everything the review promised.
    /// Lines marked unavailable were never expected, so they do not count
    /// against a clean delivery.
    pub fn is_fully_delivered(&self) -> bool {
        self.quantity_delivered == self.quantity_available && self.quantity_returned == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(requested: i32, available: i32, dispatched: i32, delivered: i32) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            line_number: 1,
            quantity_requested: requested,
            quantity_available: available,
            quantity_dispatched: dispatched,
            quantity_delivered: delivered,
            quantity_returned: 0,
            availability_status: AvailabilityStatus::Available,
            unit_price: dec!(2500),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ceiling_prefers_dispatched_quantity() {
        assert_eq!(item(10, 8, 7, 0).delivery_ceiling(), 7);
        assert_eq!(item(10, 8, 0, 0).delivery_ceiling(), 8);
    }

    #[test]
    fn delivered_value_uses_delivered_quantity() {
        assert_eq!(item(10, 10, 10, 4).delivered_value(), dec!(10000));
        assert_eq!(item(10, 10, 10, 0).delivered_value(), Decimal::ZERO);
    }

    #[test]
    fn full_delivery_measured_against_reviewed_availability() {
        assert!(item(10, 10, 10, 10).is_fully_delivered());
        assert!(!item(10, 10, 10, 9).is_fully_delivered());
        // A partial line counts as fully delivered once the reviewed
        // quantity arrives, even though less than requested.
        assert!(item(5, 2, 2, 2).is_fully_delivered());
        // An unavailable line was never expected.
        assert!(item(2, 0, 0, 0).is_fully_delivered());
        let mut rejected = item(10, 10, 10, 10);
        rejected.quantity_returned = 1;
        assert!(!rejected.is_fully_delivered());
    }
}
