use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Route lifecycle. `Completed` is derived: a route completes once every
/// order on it carries a terminal status, never by manual edit.
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
pub enum RouteStatus {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Route entity model: a named, dated grouping of orders assigned to one
/// driver and vehicle.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "routes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 50))]
    pub route_number: String,

    #[validate(length(min = 1, max = 120))]
    pub route_name: String,

    pub route_date: NaiveDate,

    #[sea_orm(column_type = "Uuid")]
    pub driver_id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub vehicle_id: Uuid,

    pub status: RouteStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::models::route_order_entity::Entity")]
    RouteOrders,
}

impl Related<crate::models::route_order_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RouteOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
