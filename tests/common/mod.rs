//! Shared harness for integration tests: an in-memory SQLite store with the
//! full schema applied and the service layer wired the way `main` wires it.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use fulfillment_api::events::EventSender;
use fulfillment_api::handlers::AppServices;
use fulfillment_api::migrator::Migrator;
use fulfillment_api::models::{
    client_entity, order_entity, order_item_entity, BillingType, DeliveryOutcome, OrderEvent,
    OrderStatus,
};
use fulfillment_api::services::delivery_reconciler::{DeliveryLine, ReconcileDelivery};
use fulfillment_api::services::orders::{CreateOrder, CreateOrderItem};
use fulfillment_api::services::route_planner::CreateRoute;
use fulfillment_api::models::ReturnReason;

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    _event_drain: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every statement on the same in-memory
        // database.
        let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
        opts.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.expect("sqlite connects");
        Migrator::up(&db, None).await.expect("migrations apply");

        let (tx, mut rx) = mpsc::channel(256);
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let db = Arc::new(db);
        let services = AppServices::new(db.clone(), Arc::new(EventSender::new(tx)));
        Self {
            db,
            services,
            _event_drain: drain,
        }
    }

    pub async fn seed_client(&self, name: &str, billing_type: BillingType) -> client_entity::Model {
        let now = Utc::now();
        client_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            billing_type: Set(billing_type),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("client inserts")
    }

    /// Creates an order with one line per `(quantity, unit_price)` pair.
    pub async fn create_order(
        &self,
        client_id: Uuid,
        lines: &[(i32, Decimal)],
    ) -> order_entity::Model {
        self.services
            .orders
            .create_order(CreateOrder {
                client_id,
                branch_id: Uuid::new_v4(),
                expected_delivery_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                requested_delivery_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                items: lines
                    .iter()
                    .map(|(quantity, price)| CreateOrderItem {
                        product_id: Uuid::new_v4(),
                        quantity_requested: *quantity,
                        unit_price: *price,
                    })
                    .collect(),
                observations: None,
            })
            .await
            .expect("order creates")
    }

    pub async fn items_of(&self, order_id: Uuid) -> Vec<order_item_entity::Model> {
        self.services
            .orders
            .get_order_with_items(order_id)
            .await
            .expect("order fetches")
            .1
    }

    /// Marks every line fully available and walks the order to
    /// `ready_dispatch`.
    pub async fn make_ready(&self, order_id: Uuid) {
        use fulfillment_api::models::AvailabilityStatus;
        for item in self.items_of(order_id).await {
            self.services
                .quantity_ledger
                .set_availability(item.id, AvailabilityStatus::Available, None)
                .await
                .expect("availability sets");
        }
        for event in [
            OrderEvent::ReviewCompleted,
            OrderEvent::ReviewCompleted,
            OrderEvent::DispatchConfirmed,
        ] {
            self.services
                .order_status
                .advance(order_id, event)
                .await
                .expect("order advances");
        }
    }

    pub async fn create_route(&self) -> fulfillment_api::models::route_entity::Model {
        self.services
            .route_planner
            .create_route(CreateRoute {
                route_name: "North loop".to_string(),
                route_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                driver_id: Uuid::new_v4(),
                vehicle_id: Uuid::new_v4(),
            })
            .await
            .expect("route creates")
    }

    /// Routes the order and walks it into `in_delivery`.
    pub async fn put_in_delivery(&self, route_id: Uuid, order_id: Uuid) {
        self.services
            .route_planner
            .assign(route_id, vec![order_id])
            .await
            .expect("order assigns");
        for event in [OrderEvent::SentToDriver, OrderEvent::ReceivedByDriver] {
            self.services
                .order_status
                .advance(order_id, event)
                .await
                .expect("order advances");
        }
    }

    /// Reconciles with per-item `(delivered, returned)` pairs matched to
    /// the order's items in creation sequence.
    pub async fn reconcile(
        &self,
        order_id: Uuid,
        outcomes: &[(i32, i32)],
        evidence: Option<&str>,
        reason: Option<ReturnReason>,
    ) -> Result<DeliveryOutcome, fulfillment_api::errors::ServiceError> {
        let items = self.items_of(order_id).await;
        assert_eq!(items.len(), outcomes.len(), "one outcome per line");
        let lines = items
            .iter()
            .zip(outcomes)
            .map(|(item, (delivered, returned))| DeliveryLine {
                item_id: item.id,
                delivered_quantity: *delivered,
                returned_quantity: *returned,
            })
            .collect();

        self.services
            .delivery_reconciler
            .reconcile(
                order_id,
                ReconcileDelivery {
                    lines,
                    evidence_ref: evidence.map(str::to_string),
                    return_reason: reason,
                    reason_note: None,
                },
            )
            .await
            .map(|r| r.outcome)
    }

    pub async fn order(&self, order_id: Uuid) -> order_entity::Model {
        self.services
            .orders
            .get_order(order_id)
            .await
            .expect("order fetches")
    }

    pub async fn assert_status(&self, order_id: Uuid, status: OrderStatus) {
        assert_eq!(self.order(order_id).await.status, status);
    }
}
