use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Which billing artifact a batch produced.
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
pub enum ExportCohort {
    /// Orders invoiced immediately with allocated invoice numbers.
    #[sea_orm(string_value = "direct_billing")]
    DirectBilling,
    /// Orders documented by remision, invoice deferred.
    #[sea_orm(string_value = "remision")]
    Remision,
}

/// Append-only audit record of one billing export run (one cohort each).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "export_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub cohort: ExportCohort,

    /// Routes covered by the run, as a JSON array of UUIDs.
    pub route_ids: Json,

    /// Orders claimed by the run, as a JSON array of UUIDs.
    pub order_ids: Json,

    /// Contiguous invoice-number range; absent for remision batches.
    pub invoice_number_start: Option<i64>,

    pub invoice_number_end: Option<i64>,

    pub total_orders: i32,

    pub total_amount: Decimal,

    #[sea_orm(column_type = "Uuid")]
    pub created_by: Uuid,

    /// Reference to the generated invoice or remision artifact.
    pub document_ref: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
