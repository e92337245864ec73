use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        number_sequence_entity::{self, ORDER_NUMBERS},
        order_entity::{
            self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        },
        order_item_entity::{
            self, ActiveModel as ItemActiveModel, Entity as ItemEntity, Model as ItemModel,
        },
        AvailabilityStatus, OrderStatus,
    },
};

lazy_static! {
    static ref ORDER_CREATIONS: IntCounter =
        IntCounter::new("order_creations_total", "Total number of orders created")
            .expect("metric can be created");
    static ref ORDER_CREATION_FAILURES: IntCounter = IntCounter::new(
        "order_creation_failures_total",
        "Total number of failed order creations"
    )
    .expect("metric can be created");
}

/// Input payload for creating an order. Producers are the staff UI and the
/// email-ingestion pipeline; both seed the same lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrder {
    pub client_id: Uuid,
    pub branch_id: Uuid,
    pub expected_delivery_date: NaiveDate,
    pub requested_delivery_date: NaiveDate,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CreateOrderItem>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderItem {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity_requested: i32,
    pub unit_price: Decimal,
}

/// Entry/exit service for orders. Status changes beyond creation go
/// through the status machine; quantity fields through the ledger.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates an order with its line items, all pending review, at status
    /// `received`. The order number comes from the shared counter inside
    /// the same transaction.
    #[instrument(skip(self, input), fields(client_id = %input.client_id, items = input.items.len()))]
    pub async fn create_order(&self, input: CreateOrder) -> Result<OrderModel, ServiceError> {
        input.validate().map_err(|e| {
            ORDER_CREATION_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;
        for item in &input.items {
            item.validate().map_err(|e| {
                ORDER_CREATION_FAILURES.inc();
                ServiceError::ValidationError(format!("Invalid item: {}", e))
            })?;
        }

        let saved_order = self.insert_order(&input).await.map_err(|e| {
            ORDER_CREATION_FAILURES.inc();
            e
        })?;

        info!(
            order_id = %saved_order.id,
            order_number = %saved_order.order_number,
            "Order created successfully"
        );

        self.event_sender
            .send(Event::OrderCreated(saved_order.id))
            .await
            .map_err(|e| {
                ORDER_CREATION_FAILURES.inc();
                ServiceError::EventError(e)
            })?;

        ORDER_CREATIONS.inc();

        Ok(saved_order)
    }

    async fn insert_order(&self, input: &CreateOrder) -> Result<OrderModel, ServiceError> {
        let input = input.clone();

        self.db
            .transaction::<_, OrderModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let number = number_sequence_entity::allocate(txn, ORDER_NUMBERS, 1).await?;
                    let total_value: Decimal = input
                        .items
                        .iter()
                        .map(|i| i.unit_price * Decimal::from(i.quantity_requested))
                        .sum();

                    let now = Utc::now();
                    let new_order = OrderActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_number: Set(format!("ORD-{:06}", number)),
                        client_id: Set(input.client_id),
                        branch_id: Set(input.branch_id),
                        status: Set(OrderStatus::Received),
                        expected_delivery_date: Set(input.expected_delivery_date),
                        requested_delivery_date: Set(input.requested_delivery_date),
                        total_value: Set(total_value),
                        is_invoiced: Set(false),
                        is_invoiced_from_remision: Set(None),
                        invoiced_at: Set(None),
                        assigned_route_id: Set(None),
                        delivery_evidence_ref: Set(None),
                        observations: Set(input.observations.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                        version: Set(1),
                    };

                    let saved_order = new_order.insert(txn).await.map_err(|e| {
                        error!("Failed to create order: {}", e);
                        ServiceError::db_error(e)
                    })?;

                    for (index, item) in input.items.iter().enumerate() {
                        let new_item = ItemActiveModel {
                            id: Set(Uuid::new_v4()),
                            order_id: Set(saved_order.id),
                            product_id: Set(item.product_id),
                            line_number: Set(index as i32 + 1),
                            quantity_requested: Set(item.quantity_requested),
                            quantity_available: Set(0),
                            quantity_dispatched: Set(0),
                            quantity_delivered: Set(0),
                            quantity_returned: Set(0),
                            availability_status: Set(AvailabilityStatus::Pending),
                            unit_price: Set(item.unit_price),
                            created_at: Set(now),
                            updated_at: Set(now),
                        };
                        new_item.insert(txn).await.map_err(|e| {
                            error!(
                                "Failed to create order item for order {}: {}",
                                saved_order.id, e
                            );
                            ServiceError::db_error(e)
                        })?;
                    }

                    Ok(saved_order)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }

    /// Gets an order by ID
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Gets an order together with its line items
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<(OrderModel, Vec<ItemModel>), ServiceError> {
        let order = self.get_order(order_id).await?;
        let items = self.items_of(&*self.db, order_id).await?;
        Ok((order, items))
    }

    pub(crate) async fn items_of(
        &self,
        db: &DatabaseConnection,
        order_id: Uuid,
    ) -> Result<Vec<ItemModel>, ServiceError> {
        Ok(ItemEntity::find()
            .filter(order_item_entity::Column::OrderId.eq(order_id))
            .order_by_asc(order_item_entity::Column::LineNumber)
            .all(db)
            .await?)
    }

    /// Resolves a human-readable order number to its ID
    pub async fn find_order_id_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Uuid>, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order_entity::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .map(|o| o.id))
    }

    /// Lists orders with pagination, optionally filtered by status
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let mut query = OrderEntity::find().order_by_desc(order_entity::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order_entity::Column::Status.eq(status));
        }

        let paginator = query.paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((orders, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> CreateOrder {
        CreateOrder {
            client_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            expected_delivery_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            requested_delivery_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            items: vec![CreateOrderItem {
                product_id: Uuid::new_v4(),
                quantity_requested: 12,
                unit_price: dec!(850),
            }],
            observations: None,
        }
    }

    #[test]
    fn create_order_requires_at_least_one_item() {
        let mut empty = input();
        empty.items.clear();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn item_quantity_must_be_positive() {
        let mut zero = input();
        zero.items[0].quantity_requested = 0;
        assert!(zero.items[0].validate().is_err());
    }
}
