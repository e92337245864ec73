//! End-to-end tests for the order lifecycle: creation through review,
//! dispatch readiness gating, and cancellation.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;

use fulfillment_api::errors::ServiceError;
use fulfillment_api::models::{AvailabilityStatus, BillingType, OrderEvent, OrderStatus};

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn order_is_created_received_with_pending_items() {
    let app = TestApp::new().await;
    let client = app.seed_client("Tienda Centro", BillingType::Facturable).await;

    let order = app
        .create_order(client.id, &[(10, dec!(2500)), (5, dec!(1000))])
        .await;

    assert_eq!(order.status, OrderStatus::Received);
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.total_value, dec!(30000));
    assert!(!order.is_invoiced);

    let items = app.items_of(order.id).await;
    assert_eq!(items.len(), 2);
    for item in &items {
        assert_eq!(item.availability_status, AvailabilityStatus::Pending);
        assert_eq!(item.quantity_available, 0);
    }
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn order_numbers_are_sequential() {
    let app = TestApp::new().await;
    let client = app.seed_client("Tienda Centro", BillingType::Facturable).await;

    let first = app.create_order(client.id, &[(1, dec!(100))]).await;
    let second = app.create_order(client.id, &[(1, dec!(100))]).await;

    assert_eq!(first.order_number, "ORD-000001");
    assert_eq!(second.order_number, "ORD-000002");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn dispatch_readiness_requires_every_line_reviewed() {
    let app = TestApp::new().await;
    let client = app.seed_client("Tienda Centro", BillingType::Facturable).await;
    let order = app
        .create_order(client.id, &[(10, dec!(2500)), (5, dec!(1000))])
        .await;

    // Review only the first line.
    let items = app.items_of(order.id).await;
    app.services
        .quantity_ledger
        .set_availability(items[0].id, AvailabilityStatus::Available, None)
        .await
        .unwrap();

    for event in [OrderEvent::ReviewCompleted, OrderEvent::ReviewCompleted] {
        app.services.order_status.advance(order.id, event).await.unwrap();
    }

    // The gate rejects the order while any line is pending.
    let err = app
        .services
        .order_status
        .advance(order.id, OrderEvent::DispatchConfirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    app.assert_status(order.id, OrderStatus::ReviewArea2).await;

    // Reviewing the second line unblocks it.
    app.services
        .quantity_ledger
        .set_availability(items[1].id, AvailabilityStatus::Unavailable, None)
        .await
        .unwrap();
    app.services
        .order_status
        .advance(order.id, OrderEvent::DispatchConfirmed)
        .await
        .unwrap();
    app.assert_status(order.id, OrderStatus::ReadyDispatch).await;
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn events_cannot_skip_stages() {
    let app = TestApp::new().await;
    let client = app.seed_client("Tienda Centro", BillingType::Facturable).await;
    let order = app.create_order(client.id, &[(10, dec!(2500))]).await;

    let err = app
        .services
        .order_status
        .advance(order.id, OrderEvent::SentToDriver)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    app.assert_status(order.id, OrderStatus::Received).await;
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn cancellation_is_terminal_and_irreversible() {
    let app = TestApp::new().await;
    let client = app.seed_client("Tienda Centro", BillingType::Facturable).await;
    let order = app.create_order(client.id, &[(10, dec!(2500))]).await;

    app.services
        .order_status
        .advance(order.id, OrderEvent::Cancel)
        .await
        .unwrap();
    app.assert_status(order.id, OrderStatus::Cancelled).await;

    for event in [
        OrderEvent::ReviewCompleted,
        OrderEvent::DispatchConfirmed,
        OrderEvent::Cancel,
    ] {
        let err = app
            .services
            .order_status
            .advance(order.id, event)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn availability_editing_is_locked_after_review() {
    let app = TestApp::new().await;
    let client = app.seed_client("Tienda Centro", BillingType::Facturable).await;
    let order = app.create_order(client.id, &[(10, dec!(2500))]).await;
    app.make_ready(order.id).await;

    let items = app.items_of(order.id).await;
    let err = app
        .services
        .quantity_ledger
        .set_availability(items[0].id, AvailabilityStatus::Partial, Some(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn partial_review_rejects_over_allocation() {
    let app = TestApp::new().await;
    let client = app.seed_client("Tienda Centro", BillingType::Facturable).await;
    let order = app.create_order(client.id, &[(10, dec!(2500))]).await;

    let items = app.items_of(order.id).await;
    let err = app
        .services
        .quantity_ledger
        .set_availability(items[0].id, AvailabilityStatus::Partial, Some(12))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OutOfRange(_)));

    // The rejected write left the line untouched.
    let items = app.items_of(order.id).await;
    assert_eq!(items[0].availability_status, AvailabilityStatus::Pending);
    assert_eq!(items[0].quantity_available, 0);
}
