use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::order::OrderStatus;

/// Order entity model.
///
/// Orders are never physically deleted; cancellation is a terminal status.
/// `version` is an optimistic-lock counter bumped on every mutation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    #[sea_orm(column_type = "Uuid")]
    pub client_id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub branch_id: Uuid,

    pub status: OrderStatus,

    pub expected_delivery_date: NaiveDate,

    pub requested_delivery_date: NaiveDate,

    pub total_value: Decimal,

    pub is_invoiced: bool,

    /// Tri-state remision marker: `None` = never remisioned,
    /// `Some(false)` = remisioned with the invoice still pending,
    /// `Some(true)` = remision later promoted to an invoice.
    pub is_invoiced_from_remision: Option<bool>,

    pub invoiced_at: Option<DateTime<Utc>>,

    pub assigned_route_id: Option<Uuid>,

    /// Reference to the delivery evidence captured at reconciliation.
    pub delivery_evidence_ref: Option<String>,

    pub observations: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::models::order_item_entity::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "crate::models::client_entity::Entity",
        from = "Column::ClientId",
        to = "crate::models::client_entity::Column::Id"
    )]
    Client,
}

impl Related<crate::models::order_item_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<crate::models::client_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the order is eligible for the billing export queue.
    pub fn is_billable(&self) -> bool {
        self.status.is_billable() && !self.is_invoiced
    }

    /// Whether the order was remisioned and still awaits its invoice.
    pub fn awaits_remision_invoice(&self) -> bool {
        self.is_invoiced_from_remision == Some(false) && !self.is_invoiced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus, is_invoiced: bool) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            order_number: "ORD-000001".into(),
            client_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            status,
            expected_delivery_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            requested_delivery_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            total_value: dec!(150000),
            is_invoiced,
            is_invoiced_from_remision: None,
            invoiced_at: None,
            assigned_route_id: None,
            delivery_evidence_ref: None,
            observations: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn billable_only_when_delivery_terminal_and_not_invoiced() {
        assert!(order(OrderStatus::Delivered, false).is_billable());
        assert!(order(OrderStatus::PartiallyDelivered, false).is_billable());
        assert!(!order(OrderStatus::Delivered, true).is_billable());
        assert!(!order(OrderStatus::Returned, false).is_billable());
        assert!(!order(OrderStatus::InDelivery, false).is_billable());
    }

    #[test]
    fn remision_queue_membership() {
        let mut o = order(OrderStatus::Delivered, false);
        assert!(!o.awaits_remision_invoice());
        o.is_invoiced_from_remision = Some(false);
        assert!(o.awaits_remision_invoice());
        o.is_invoiced = true;
        o.is_invoiced_from_remision = Some(true);
        assert!(!o.awaits_remision_invoice());
    }
}
