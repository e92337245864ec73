use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub const ORDER_NUMBERS: &str = "order_numbers";
pub const ROUTE_NUMBERS: &str = "route_numbers";
pub const INVOICE_NUMBERS: &str = "invoice_numbers";

/// Named monotonic counters backing order- and invoice-number allocation.
///
/// Ranges stay contiguous because the claim happens inside the caller's
/// transaction: the row is read and advanced before any dependent write
/// commits.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "number_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    pub next_number: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Claims `count` consecutive numbers from the named sequence and returns
/// the first of the range. Seeds the counter at 1 on first use.
pub async fn allocate<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    count: i64,
) -> Result<i64, ServiceError> {
    if count < 1 {
        return Err(ServiceError::ValidationError(format!(
            "Sequence allocation count must be positive, got {count}"
        )));
    }

    match Entity::find_by_id(name.to_string()).one(conn).await? {
        Some(row) => {
            let start = row.next_number;
            let mut active: ActiveModel = row.into();
            active.next_number = Set(start + count);
            active.update(conn).await?;
            Ok(start)
        }
        None => {
            let seeded = ActiveModel {
                name: Set(name.to_string()),
                next_number: Set(1 + count),
            };
            seeded.insert(conn).await?;
            Ok(1)
        }
    }
}
